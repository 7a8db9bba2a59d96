/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod custom_error;
pub mod execute_query;
pub mod expression;
pub mod loader;
pub mod parser;
pub mod query_plan;
pub mod results;
pub mod triple_store;
pub mod utils;

pub use custom_error::{LoadError, QueryError};
pub use execute_query::{execute_query, QueryOptions};
pub use loader::{load_documents, DocumentParser, DocumentSource, LoadReport, NTriplesParser};
pub use results::QueryResults;
pub use triple_store::TripleStore;
