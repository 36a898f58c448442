//! 钱包核心路径基准测试
//! 使用criterion进行性能测试

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use turawallet::{
    domain::{
        balance::normalize_balances,
        derivation::derive_account,
        fee::Fee,
        ChainConfig, Coin, RecoveryPhrase, TokenConfig,
    },
    infrastructure::log_redact::redact_phrases,
    service::transaction_builder::{build_signed_tx, MsgSend, SignerData},
};

const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn bench_derive_account(c: &mut Criterion) {
    let chain = ChainConfig::default();
    let phrase = RecoveryPhrase::parse(PHRASE).unwrap();

    c.bench_function("derive_account", |b| {
        b.iter(|| derive_account(black_box(&phrase), &chain).unwrap())
    });
}

fn bench_build_signed_tx(c: &mut Criterion) {
    let account = derive_account(&RecoveryPhrase::parse(PHRASE).unwrap(), &ChainConfig::default())
        .unwrap();
    let msg = MsgSend::new(
        &account.address,
        "tura1qypqxpq9qcrsszg2pvxq6rs0zqg3yyc5lzv7xu",
        Coin::new("utura", 1_500_000),
    );
    let signer = SignerData {
        chain_id: "tura-beta-1".into(),
        account_number: 7,
        sequence: 3,
    };
    let fee = Fee {
        amount: Coin::new("utura", 2000),
        gas_limit: 200_000,
    };

    c.bench_function("build_signed_tx", |b| {
        b.iter(|| build_signed_tx(black_box(&msg), "", &account, &signer, &fee))
    });
}

fn bench_normalize_balances(c: &mut Criterion) {
    let tokens = vec![TokenConfig::tura(), TokenConfig::tags()];
    let coins: Vec<Coin> = (0..100)
        .map(|i| Coin::new(format!("ibc/{:064X}", i), i as u128))
        .chain([Coin::new("utura", 2_500_000), Coin::new("utags", 42)])
        .collect();

    c.bench_function("normalize_balances", |b| {
        b.iter(|| normalize_balances(black_box(&coins), &tokens))
    });
}

fn bench_redact_phrases(c: &mut Criterion) {
    let message = format!("broadcast failed for {} at height 12", PHRASE);

    c.bench_function("redact_phrases", |b| {
        b.iter(|| redact_phrases(black_box(&message)))
    });
}

criterion_group!(
    benches,
    bench_derive_account,
    bench_build_signed_tx,
    bench_normalize_balances,
    bench_redact_phrases
);
criterion_main!(benches);
