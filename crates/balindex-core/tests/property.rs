use std::collections::BTreeMap;

use balindex_core::{block_deltas, extract, merge, AddressDelta, BigInt};
use balindex_core::{Transaction, TxInput, TxOutput, TxStatus};

const ADDRESSES: [&str; 5] = ["A", "B", "C", "D", "E"];

struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn gen_range(&mut self, max: usize) -> usize {
        if max == 0 {
            0
        } else {
            (self.next_u64() % max as u64) as usize
        }
    }

    fn gen_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range(i + 1);
            items.swap(i, j);
        }
    }
}

fn random_deltas(rng: &mut Lcg, len: usize) -> Vec<AddressDelta> {
    (0..len)
        .map(|_| {
            let address = ADDRESSES[rng.gen_range(ADDRESSES.len())];
            let magnitude = BigInt::from(rng.next_u64()) * BigInt::from(rng.next_u64());
            let delta = if rng.gen_bool() { magnitude } else { -magnitude };
            AddressDelta::new(address, delta)
        })
        .collect()
}

fn maybe_address(rng: &mut Lcg) -> Option<String> {
    if rng.gen_range(4) == 0 {
        None
    } else {
        Some(ADDRESSES[rng.gen_range(ADDRESSES.len())].to_string())
    }
}

fn random_tx(rng: &mut Lcg) -> Transaction {
    let vin = (0..rng.gen_range(4))
        .map(|i| TxInput {
            txid: format!("{i:064x}"),
            vout: i as u32,
            prevout: if rng.gen_range(5) == 0 {
                None
            } else {
                Some(TxOutput {
                    value: rng.next_u64() >> 12,
                    scriptpubkey_address: maybe_address(rng),
                })
            },
        })
        .collect();
    let vout = (0..rng.gen_range(4))
        .map(|_| TxOutput {
            value: rng.next_u64() >> 12,
            scriptpubkey_address: maybe_address(rng),
        })
        .collect();
    Transaction {
        txid: format!("{:064x}", rng.next_u64()),
        vin,
        vout,
        status: TxStatus { block_height: None },
    }
}

fn reference_sums(deltas: &[AddressDelta]) -> BTreeMap<String, BigInt> {
    let mut sums: BTreeMap<String, BigInt> = BTreeMap::new();
    for d in deltas {
        *sums.entry(d.address.clone()).or_default() += &d.delta;
    }
    sums
}

#[test]
fn merge_matches_arithmetic_sum_in_any_order() {
    let mut rng = Lcg::new(0x5eed_0001);
    for _ in 0..200 {
        let len = rng.gen_range(40);
        let mut deltas = random_deltas(&mut rng, len);
        let expected = reference_sums(&deltas);

        let merged = merge(deltas.clone());
        assert_eq!(merged.len(), expected.len());
        for d in &merged {
            assert_eq!(&d.delta, &expected[&d.address]);
        }

        rng.shuffle(&mut deltas);
        assert_eq!(merge(deltas), merged);
    }
}

#[test]
fn merge_is_associative_across_scopes() {
    let mut rng = Lcg::new(0x5eed_0002);
    for _ in 0..100 {
        let blocks: Vec<Vec<Vec<AddressDelta>>> = (0..rng.gen_range(6))
            .map(|_| {
                (0..rng.gen_range(5))
                    .map(|_| {
                        let len = rng.gen_range(8);
                        random_deltas(&mut rng, len)
                    })
                    .collect()
            })
            .collect();

        let flat = merge(blocks.iter().flatten().flatten().cloned());

        let per_block: Vec<Vec<AddressDelta>> = blocks
            .iter()
            .map(|txs| merge(txs.iter().map(|tx| merge(tx.clone())).flatten()))
            .collect();
        let mut per_block_shuffled = per_block.clone();
        rng.shuffle(&mut per_block_shuffled);

        assert_eq!(merge(per_block.into_iter().flatten()), flat);
        assert_eq!(merge(per_block_shuffled.into_iter().flatten()), flat);
    }
}

#[test]
fn extraction_is_order_independent() {
    let mut rng = Lcg::new(0x5eed_0003);
    for _ in 0..200 {
        let mut tx = random_tx(&mut rng);
        let outputs_first = merge(tx.output_deltas().into_iter().chain(tx.input_deltas()));
        let inputs_first = merge(tx.input_deltas().into_iter().chain(tx.output_deltas()));
        assert_eq!(outputs_first, inputs_first);
        assert_eq!(extract(&tx), outputs_first);

        rng.shuffle(&mut tx.vin);
        rng.shuffle(&mut tx.vout);
        assert_eq!(extract(&tx), outputs_first);
    }
}

#[test]
fn block_deltas_equal_flat_transaction_merge() {
    let mut rng = Lcg::new(0x5eed_0004);
    for _ in 0..50 {
        let txs: Vec<Transaction> = (0..rng.gen_range(10)).map(|_| random_tx(&mut rng)).collect();
        let flat = merge(txs.iter().flat_map(|tx| {
            tx.output_deltas().into_iter().chain(tx.input_deltas())
        }));
        assert_eq!(block_deltas(&txs), flat);
    }
}
