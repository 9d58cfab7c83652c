use criterion::{criterion_group, criterion_main, Criterion};
use ledger_core::{mine_block, validate_chain, Block, Blockchain, Transaction, Wallet};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn bench_pow(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let genesis = vec![Block::genesis()];
    let txs: Vec<Transaction> = (0..10)
        .map(|_| {
            Transaction::new(&Wallet::new(), &genesis, "bob", rng.gen_range(1..10))
                .expect("fresh wallet covers the amount")
        })
        .collect();

    c.bench_function("mine_block_from_genesis", |b| {
        b.iter(|| mine_block(&genesis[0], txs.clone()));
    });

    let mut blockchain = Blockchain::new();
    for _ in 0..5 {
        blockchain.add_block(vec![Transaction::reward(&Wallet::new())]);
    }
    c.bench_function("validate_chain_5_blocks", |b| {
        b.iter(|| validate_chain(blockchain.blocks()));
    });
}

criterion_group!(benches, bench_pow);
criterion_main!(benches);
