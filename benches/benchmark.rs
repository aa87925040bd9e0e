use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use leadsift::compile::compile;
use leadsift::construct::{NewContact, PersistenceMode, TenantId};
use leadsift::filter::{Condition, FilterPolicy, FilterState};
use leadsift::interface::ContactInterface;
use leadsift::persist::Persistor;
use leadsift::search;

fn filter_of(size: usize) -> FilterState {
    let fields = ["email", "title", "city", "tags", "createdAt"];
    let conditions = (0..size)
        .map(|i| Condition::contains(fields[i % fields.len()], format!("v{i}")))
        .collect();
    FilterState::any(conditions)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let tenant = TenantId::new("org_bench");

    for size in [1, 10, 100] {
        let filter = filter_of(size);
        c.bench_function(&format!("compile {size}"), |b| {
            b.iter(|| compile(black_box(&filter), &tenant).render())
        });
    }

    let filter = filter_of(10);
    c.bench_function("compile 10 + search", |b| {
        b.iter(|| search::matching(&tenant, Some(black_box(&filter)), Some("ada")).render())
    });

    let persistor = Persistor::new(PersistenceMode::InMemory).expect("store");
    for i in 0..1_000 {
        let contact = NewContact::new(format!("c{i}"))
            .email(&format!("person{i}@example.com"))
            .lead_status(if i % 3 == 0 { "NEW" } else { "WON" });
        persistor.add_contact(&tenant, &contact).expect("contact");
        if i % 10 == 0 {
            persistor.tag_contact(&tenant, &format!("c{i}"), "vip").expect("tag");
        }
    }
    let interface = ContactInterface::new(persistor, FilterPolicy::Lenient);
    let filter = FilterState::all(vec![
        Condition::equals("leadStatus", "NEW"),
        Condition::equals("tags", "vip"),
    ]);
    c.bench_function("list 1k filtered", |b| {
        b.iter(|| interface.list(&tenant, Some(black_box(&filter)), Some("example")))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
