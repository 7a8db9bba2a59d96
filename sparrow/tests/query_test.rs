/*
 * Copyright © 2025 Volodymyr Kadzhaia
 * Copyright © 2025 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

extern crate sparrow;
use shared::terms::{Term, XSD_INTEGER};
use sparrow::{
    execute_query, load_documents, DocumentSource, NTriplesParser, QueryError, QueryOptions,
    QueryResults, TripleStore,
};

const MOVIES: &str = r#"
<http://example.org/m1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/Movie> .
<http://example.org/m1> <http://example.org/title> "Robocop" .
<http://example.org/m1> <http://example.org/hasActor> <http://example.org/a1> .
<http://example.org/m1> <http://example.org/released> "1987-07-17"^^<http://www.w3.org/2001/XMLSchema#date> .
<http://example.org/m1> <http://example.org/runtime> "102"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.org/m2> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/Movie> .
<http://example.org/m2> <http://example.org/title> "Alien" .
<http://example.org/m2> <http://example.org/hasActor> <http://example.org/a2> .
<http://example.org/m2> <http://example.org/hasActor> <http://example.org/a3> .
<http://example.org/m2> <http://example.org/hasDirector> <http://example.org/d1> .
<http://example.org/m2> <http://example.org/released> "1979-05-25"^^<http://www.w3.org/2001/XMLSchema#date> .
<http://example.org/m2> <http://example.org/runtime> "117"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://example.org/a1> <http://example.org/name> "Peter Weller" .
<http://example.org/a2> <http://example.org/name> "Sigourney Weaver" .
<http://example.org/a3> <http://example.org/name> "Tom Skerritt" .
"#;

const PREFIX: &str = "PREFIX ex: <http://example.org/>\n";

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_store(documents: &[(&str, &str)]) -> TripleStore {
        let mut store = TripleStore::new();
        let sources: Vec<DocumentSource> = documents
            .iter()
            .map(|(id, content)| DocumentSource::inline(*id, *content))
            .collect();
        let report = load_documents(&mut store, &sources, &NTriplesParser);
        assert!(report.is_complete(), "{:?}", report.failures);
        store
    }

    fn movies() -> TripleStore {
        setup_store(&[("movies.nt", MOVIES)])
    }

    fn run(store: &TripleStore, body: &str) -> QueryResults {
        execute_query(store, &format!("{}{}", PREFIX, body), &QueryOptions::default()).unwrap()
    }

    fn column(results: &QueryResults, var: &str) -> Vec<Option<Term>> {
        (0..results.len())
            .map(|row| results.value(row, var).cloned())
            .collect()
    }

    #[test]
    fn test_robocop_scenario() {
        let store = movies();
        let results = run(
            &store,
            r#"SELECT ?title ?actor WHERE {
                ?m rdf:type ex:Movie .
                ?m ex:title ?title .
                ?m ex:hasActor ?actor .
                FILTER(CONTAINS(LCASE(?title), "robocop"))
            }"#,
        );
        assert_eq!(results.vars, vec!["title", "actor"]);
        assert_eq!(results.len(), 1);
        assert_eq!(results.value(0, "title"), Some(&Term::plain("Robocop")));
        assert_eq!(
            results.value(0, "actor"),
            Some(&Term::iri("http://example.org/a1"))
        );
    }

    #[test]
    fn test_missing_director_is_absent() {
        let store = movies();
        let results = run(
            &store,
            r#"SELECT ?title ?director WHERE {
                ?m ex:title ?title .
                OPTIONAL { ?m ex:hasDirector ?director }
                FILTER(?title = "Robocop")
            }"#,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results.value(0, "director"), None);

        let json: serde_json::Value = serde_json::from_str(&results.to_json().unwrap()).unwrap();
        let row = &json["results"]["bindings"][0];
        assert!(row.get("title").is_some());
        assert!(row.get("director").is_none());
    }

    #[test]
    fn test_optional_never_reduces_rows() {
        let store = movies();
        let without = run(&store, "SELECT ?m WHERE { ?m a ex:Movie }");
        let with = run(
            &store,
            "SELECT ?m ?d WHERE { ?m a ex:Movie OPTIONAL { ?m ex:hasDirector ?d } }",
        );
        assert_eq!(without.len(), 2);
        assert_eq!(with.len(), 2);
        assert_eq!(
            column(&with, "d"),
            vec![None, Some(Term::iri("http://example.org/d1"))]
        );
    }

    #[test]
    fn test_optional_with_inner_filter_keeps_outer_binding() {
        let store = movies();
        let results = run(
            &store,
            r#"SELECT ?title ?name WHERE {
                ?m ex:title ?title .
                OPTIONAL { ?m ex:hasActor ?a . ?a ex:name ?name FILTER(CONTAINS(?name, "Tom")) }
            }"#,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(
            column(&results, "name"),
            vec![None, Some(Term::plain("Tom Skerritt"))]
        );
    }

    #[test]
    fn test_syntax_error_is_an_error() {
        let store = movies();
        let result = execute_query(&store, "SELECT ?x WHERE { ?x ", &QueryOptions::default());
        assert!(matches!(result, Err(QueryError::Syntax(_))));
    }

    #[test]
    fn test_blank_nodes_are_scoped_per_document() {
        let first = "_:b1 <http://example.org/p> \"one\" .";
        let second = "_:b1 <http://example.org/q> \"two\" .";
        let store = setup_store(&[("first.nt", first), ("second.nt", second)]);
        assert_eq!(store.size(), 2);

        let merged = run(&store, "SELECT ?x WHERE { ?b ex:p ?x . ?b ex:q ?y }");
        assert!(merged.is_empty());
        let separate = run(&store, "SELECT ?x ?y WHERE { ?b1 ex:p ?x . ?b2 ex:q ?y }");
        assert_eq!(separate.len(), 1);
        let subjects = run(&store, "SELECT DISTINCT ?s WHERE { ?s ?p ?o }");
        assert_eq!(subjects.len(), 2);
    }

    #[test]
    fn test_distinct_then_limit() {
        let store = movies();
        let all = run(&store, "SELECT ?m WHERE { ?m ex:hasActor ?a }");
        assert_eq!(all.len(), 3);
        let distinct = run(&store, "SELECT DISTINCT ?m WHERE { ?m ex:hasActor ?a }");
        assert_eq!(distinct.len(), 2);
        let limited = run(&store, "SELECT DISTINCT ?m WHERE { ?m ex:hasActor ?a } LIMIT 1");
        assert_eq!(limited.rows, distinct.rows[..1].to_vec());
        let zero = run(&store, "SELECT ?m WHERE { ?m ex:hasActor ?a } LIMIT 0");
        assert!(zero.is_empty());
        assert_eq!(zero.vars, vec!["m"]);
    }

    #[test]
    fn test_group_concat_distinct() {
        let data = r#"
<http://example.org/s> <http://example.org/v> "a" .
<http://example.org/t> <http://example.org/v> "a" .
<http://example.org/u> <http://example.org/v> "b" .
"#;
        let store = setup_store(&[("values.nt", data)]);
        let results = run(
            &store,
            r#"SELECT (GROUP_CONCAT(DISTINCT ?v; separator=", ") AS ?all) WHERE { ?s ex:v ?v }"#,
        );
        assert_eq!(results.len(), 1);
        let joined = results.value(0, "all").cloned();
        assert!(
            joined == Some(Term::plain("a, b")) || joined == Some(Term::plain("b, a")),
            "{:?}",
            joined
        );
    }

    #[test]
    fn test_count_per_group_and_over_nothing() {
        let store = movies();
        let results = run(
            &store,
            "SELECT ?m (COUNT(?a) AS ?actors) WHERE { ?m ex:hasActor ?a } GROUP BY ?m",
        );
        assert_eq!(
            column(&results, "actors"),
            vec![
                Some(Term::typed("1", XSD_INTEGER)),
                Some(Term::typed("2", XSD_INTEGER))
            ]
        );

        let empty = run(&store, "SELECT (COUNT(*) AS ?n) WHERE { ?m ex:missing ?x }");
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.value(0, "n"), Some(&Term::integer(0)));
    }

    #[test]
    fn test_sample_is_a_group_member() {
        let store = movies();
        let results = run(
            &store,
            "SELECT (SAMPLE(?a) AS ?any) WHERE { ex:m2 ex:hasActor ?a }",
        );
        let candidates = [
            Term::iri("http://example.org/a2"),
            Term::iri("http://example.org/a3"),
        ];
        let sample = results.value(0, "any").unwrap();
        assert!(candidates.contains(sample));
    }

    #[test]
    fn test_sequential_optionals_with_grouping() {
        let data = r#"
<http://dbpedia.org/resource/Robocop> <http://dbpedia.org/ontology/name> "Robocop" .
<http://dbpedia.org/resource/Robocop> <http://dbpedia.org/ontology/country> <http://dbpedia.org/resource/United_States> .
<http://dbpedia.org/resource/Robocop> <http://dbpedia.org/ontology/starring> <http://dbpedia.org/resource/Peter_Weller> .
<http://dbpedia.org/resource/Robocop> <http://dbpedia.org/ontology/starring> <http://dbpedia.org/resource/Nancy_Allen> .
<http://dbpedia.org/resource/Robocop> <http://dbpedia.org/ontology/runtime> "102"^^<http://www.w3.org/2001/XMLSchema#integer> .
<http://dbpedia.org/resource/Lorax> <http://dbpedia.org/ontology/name> "Lorax" .
<http://dbpedia.org/resource/Lorax> <http://dbpedia.org/ontology/country> <http://dbpedia.org/resource/United_States> .
"#;
        let store = setup_store(&[("films.nt", data)]);
        let results = execute_query(
            &store,
            r#"PREFIX dbo: <http://dbpedia.org/ontology/>
            SELECT ?title
                   (SAMPLE(REPLACE(STR(?country), "http://dbpedia.org/resource/", "")) AS ?country)
                   (GROUP_CONCAT(DISTINCT REPLACE(STR(COALESCE(?director, "")), "http://dbpedia.org/resource/", ""); separator=", ") AS ?directors)
                   (GROUP_CONCAT(DISTINCT REPLACE(STR(COALESCE(?actor, "")), "http://dbpedia.org/resource/", ""); separator=", ") AS ?actors)
                   (SAMPLE(?runtime) AS ?runtime)
            WHERE {
                ?movie dbo:name ?title .
                OPTIONAL { ?movie dbo:country ?country }
                OPTIONAL { ?movie dbo:director ?director }
                OPTIONAL { ?movie dbo:starring ?actor }
                OPTIONAL { ?movie dbo:runtime ?runtime }
            }
            GROUP BY ?movie ?title"#,
            &QueryOptions::default(),
        )
        .unwrap();

        assert_eq!(results.vars, vec!["title", "country", "directors", "actors", "runtime"]);
        assert_eq!(results.len(), 2);
        let row_of = |title: &str| {
            (0..results.len())
                .find(|&row| results.value(row, "title") == Some(&Term::plain(title)))
                .unwrap()
        };

        let robocop = row_of("Robocop");
        assert_eq!(results.value(robocop, "country"), Some(&Term::plain("United_States")));
        assert_eq!(results.value(robocop, "directors"), Some(&Term::plain("")));
        let actors = match results.value(robocop, "actors") {
            Some(Term::Literal { lexical, .. }) => lexical.clone(),
            other => panic!("unexpected actors cell {:?}", other),
        };
        let mut actors: Vec<&str> = actors.split(", ").collect();
        actors.sort();
        assert_eq!(actors, vec!["Nancy_Allen", "Peter_Weller"]);
        assert_eq!(results.value(robocop, "runtime"), Some(&Term::integer(102)));

        let lorax = row_of("Lorax");
        assert_eq!(results.value(lorax, "directors"), Some(&Term::plain("")));
        assert_eq!(results.value(lorax, "actors"), Some(&Term::plain("")));
        assert_eq!(results.value(lorax, "runtime"), None);
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let store = movies();
        let joined = run(
            &store,
            "SELECT ?m ?t WHERE { ?m ex:title ?t ; ex:hasActor ?a }",
        );
        assert_eq!(joined.len(), 3);

        let distinct = run(
            &store,
            "SELECT DISTINCT ?m ?t WHERE { ?m ex:title ?t ; ex:hasActor ?a }",
        );
        assert_eq!(distinct.len(), 2);
        let unique: std::collections::HashSet<_> = distinct.rows.iter().collect();
        assert_eq!(unique.len(), distinct.rows.len());

        let mut again = Vec::new();
        for row in &distinct.rows {
            if !again.contains(row) {
                again.push(row.clone());
            }
        }
        assert_eq!(again, distinct.rows);
    }

    #[test]
    fn test_language_tags_separate_equal_text() {
        let data = r#"
<http://example.org/w> <http://example.org/label> "chat"@en .
<http://example.org/w> <http://example.org/label> "chat"@fr .
<http://example.org/w> <http://example.org/label> "chat" .
"#;
        let store = setup_store(&[("labels.nt", data)]);
        let french = run(
            &store,
            r#"SELECT ?l WHERE { ex:w ex:label ?l FILTER(?l = "chat"@fr) }"#,
        );
        assert_eq!(column(&french, "l"), vec![Some(Term::lang("chat", "fr"))]);

        let others = run(
            &store,
            r#"SELECT ?l WHERE { ex:w ex:label ?l FILTER(?l != "chat"@fr) }"#,
        );
        assert_eq!(others.len(), 2);
        assert!(!column(&others, "l").contains(&Some(Term::lang("chat", "fr"))));
    }

    #[test]
    fn test_date_and_number_filters() {
        let store = movies();
        let old = run(
            &store,
            r#"SELECT ?title WHERE {
                ?m ex:title ?title ; ex:released ?d .
                FILTER(?d < "1980-01-01"^^xsd:date)
            }"#,
        );
        assert_eq!(column(&old, "title"), vec![Some(Term::plain("Alien"))]);

        let long = run(
            &store,
            "SELECT ?title WHERE { ?m ex:title ?title ; ex:runtime ?r FILTER(?r >= 110.5) }",
        );
        assert_eq!(column(&long, "title"), vec![Some(Term::plain("Alien"))]);

        // A string never compares with a number
        let mixed = run(
            &store,
            "SELECT ?title WHERE { ?m ex:title ?title FILTER(?title > 3 || ?title != 3) }",
        );
        assert!(mixed.is_empty());
    }

    #[test]
    fn test_select_star_and_expressions() {
        let store = movies();
        let star = run(&store, "SELECT * WHERE { ?m ex:hasDirector ?d }");
        assert_eq!(star.vars, vec!["m", "d"]);
        assert_eq!(star.len(), 1);

        let upper = run(
            &store,
            r#"SELECT (LCASE(?t) AS ?quiet) (REPLACE(?t, "o", "0") AS ?leet) (COALESCE(?missing, "n/a") AS ?fallback)
               WHERE { ex:m1 ex:title ?t }"#,
        );
        assert_eq!(upper.value(0, "quiet"), Some(&Term::plain("robocop")));
        assert_eq!(upper.value(0, "leet"), Some(&Term::plain("R0b0c0p")));
        assert_eq!(upper.value(0, "fallback"), Some(&Term::plain("n/a")));
    }

    #[test]
    fn test_unknown_constant_matches_nothing() {
        let store = movies();
        let results = run(&store, "SELECT ?x WHERE { ?x ex:neverSeen ?y }");
        assert!(results.is_empty());
        assert_eq!(results.vars, vec!["x"]);
    }

    #[test]
    fn test_row_budget_marks_truncation() {
        let store = movies();
        let options = QueryOptions { max_rows: Some(2) };
        let results = execute_query(
            &store,
            "SELECT ?s WHERE { ?s ?p ?o }",
            &options,
        )
        .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.truncated);

        let fits = execute_query(&store, "SELECT ?s WHERE { ?s ?p ?o } LIMIT 2", &options).unwrap();
        assert!(!fits.truncated);
    }

    #[test]
    fn test_semantic_errors() {
        let store = movies();
        let ungrouped = execute_query(
            &store,
            "SELECT ?m (COUNT(?a) AS ?n) WHERE { ?m <http://example.org/hasActor> ?a }",
            &QueryOptions::default(),
        );
        assert_eq!(ungrouped, Err(QueryError::UngroupedVariable("m".to_string())));

        let prefix = execute_query(&store, "SELECT ?m WHERE { ?m foo:bar ?a }", &QueryOptions::default());
        assert_eq!(prefix, Err(QueryError::UnknownPrefix("foo".to_string())));
    }
}
