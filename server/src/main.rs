// Forkful
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the restaurant reviews service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use forkful_core::db::Db;
use forkful_core::db::postgres::{PostgresDb, PostgresOptions};
use forkful_core::env::get_optional_var;
use forkful_server::db::init_schema;
use forkful_server::driver::DriverOptions;
use forkful_server::serve;
use log::{error, info};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Prefix of all environment variables that configure the service.
const ENV_PREFIX: &str = "FORKFUL";

/// Default port to listen on when `FORKFUL_PORT` is not set.
const DEFAULT_PORT: u16 = 3000;

/// Loads the configuration, prepares the database and serves the app until it terminates.
async fn run() -> Result<(), String> {
    let port = get_optional_var::<u16>(ENV_PREFIX, "PORT")?.unwrap_or(DEFAULT_PORT);
    let addr = (Ipv4Addr::UNSPECIFIED, port);

    let db_opts = PostgresOptions::from_env(&format!("{}_PGSQL", ENV_PREFIX))?;
    let driver_opts = DriverOptions::from_env(ENV_PREFIX)?;

    let db = Arc::from(PostgresDb::connect(db_opts).map_err(|e| e.to_string())?);
    {
        let mut ex = db.ex().await.map_err(|e| e.to_string())?;
        init_schema(&mut ex).await.map_err(|e| e.to_string())?;
    }

    info!("Listening on port {}", port);
    serve(addr, db, driver_opts).await.map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}
