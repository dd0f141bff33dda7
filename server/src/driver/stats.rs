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

//! Aggregated statistics.

use crate::db;
use crate::driver::Driver;
use crate::model::CuisineStats;
use forkful_core::driver::DriverResult;

impl Driver {
    /// Computes rating statistics for every cuisine served by at least one restaurant.
    pub(crate) async fn cuisine_stats(self) -> DriverResult<Vec<CuisineStats>> {
        let mut tx = self.db.begin().await?;
        let stats = db::get_cuisine_stats(tx.ex()).await?;
        tx.commit().await?;
        Ok(stats)
    }
}
