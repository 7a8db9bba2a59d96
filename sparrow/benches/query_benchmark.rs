/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate criterion;
extern crate sparrow;

use criterion::*;
use sparrow::*;

// Synthetic employee graph: name, salary and workplace per employee
fn employee_data(count: usize) -> String {
    let mut data = String::new();
    for i in 0..count {
        data.push_str(&format!(
            "<http://example.org/employee{i}> <http://xmlns.com/foaf/0.1/name> \"Employee {i}\" .\n\
             <http://example.org/employee{i}> <http://example.org/annual_salary> \"{salary}\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n\
             <http://example.org/employee{i}> <http://example.org/worksAt> <http://example.org/company{company}> .\n",
            i = i,
            salary = 40_000 + (i * 37) % 90_000,
            company = i % 50,
        ));
    }
    data
}

fn setup_store(data: &str) -> TripleStore {
    let mut store = TripleStore::new();
    load_documents(
        &mut store,
        &[DocumentSource::inline("employees.nt", data)],
        &NTriplesParser,
    );
    store
}

fn run(store: &TripleStore, sparql: &str) -> QueryResults {
    match execute_query(store, sparql, &QueryOptions::default()) {
        Ok(results) => results,
        Err(err) => panic!("benchmark query failed: {}", err),
    }
}

fn query_benchmark(c: &mut Criterion) {
    let data = employee_data(10_000);
    c.bench_function("load_30k_triples", |b| b.iter(|| setup_store(black_box(&data))));

    let store = setup_store(&data);

    let join = r#"
    PREFIX ex: <http://example.org/>
    PREFIX foaf: <http://xmlns.com/foaf/0.1/>
    SELECT ?employee ?name ?salary
    WHERE {
        ?employee foaf:name ?name .
        ?employee ex:annual_salary ?salary
        FILTER(?salary > 75000)
    }"#;
    c.bench_function("join_with_filter", |b| b.iter(|| run(&store, black_box(join))));

    let limited = r#"
    PREFIX ex: <http://example.org/>
    SELECT ?employee WHERE { ?employee ex:worksAt ex:company7 } LIMIT 10"#;
    c.bench_function("bound_object_limit", |b| b.iter(|| run(&store, black_box(limited))));

    let grouped = r#"
    PREFIX ex: <http://example.org/>
    SELECT ?company (COUNT(?employee) AS ?staff) (SAMPLE(?salary) AS ?example)
    WHERE {
        ?employee ex:worksAt ?company ;
                  ex:annual_salary ?salary .
    }
    GROUP BY ?company"#;
    c.bench_function("group_by_aggregate", |b| b.iter(|| run(&store, black_box(grouped))));
}

criterion_group!(benches, query_benchmark);
criterion_main!(benches);
