use common::database::Database;
use common::query_tree::Predicate;
use common::statement::{JoinConstraint, QueryStatement, SelectItem};
use common::testutil::chain_database;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use optimizer::Optimizer;

/// `SELECT T0.v0 FROM T0 JOIN T1 ON T0.id = T1.id ...` over `n` tables.
fn chain_query(n: usize) -> QueryStatement {
    let mut stmt = QueryStatement::new(
        vec![SelectItem::Column(String::from("T0.v0"))],
        vec!["T0"],
    );
    for i in 1..n {
        stmt = stmt.with_join(
            &format!("T{}", i),
            JoinConstraint::On(vec![Predicate::column_eq(
                &format!("T{}.id", i - 1),
                &format!("T{}.id", i),
            )]),
        );
    }
    stmt
}

fn bench_chain(c: &mut Criterion, db: &Database, n: usize) {
    let stmt = chain_query(n);
    c.bench_function(&format!("optimize_{}_way", n), |b| {
        b.iter(|| {
            let mut optimizer = Optimizer::new(db, black_box(stmt.clone())).unwrap();
            optimizer.optimize().unwrap().len()
        })
    });
}

fn bench_optimizer(c: &mut Criterion) {
    for n in &[2, 3, 5] {
        let db = chain_database(*n);
        bench_chain(c, &db, *n);
    }
}

criterion_group!(benches, bench_optimizer);
criterion_main!(benches);
