// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

/// Controls whether `rank`/`quantile` queries treat the boundary item as
/// `<=` (`Inclusive`) or `<` (`Exclusive`) of the query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantileSearchCriterion {
    /// Rank of the last item `<= x`; quantile crossing point is `>= r * n`.
    #[default]
    Inclusive,
    /// Rank of the last item `< x`; quantile crossing point is `> r * n`.
    Exclusive,
}

impl QuantileSearchCriterion {
    pub(crate) fn is_inclusive(self) -> bool {
        matches!(self, QuantileSearchCriterion::Inclusive)
    }
}

impl From<bool> for QuantileSearchCriterion {
    fn from(inclusive: bool) -> Self {
        if inclusive {
            QuantileSearchCriterion::Inclusive
        } else {
            QuantileSearchCriterion::Exclusive
        }
    }
}

impl From<QuantileSearchCriterion> for bool {
    fn from(crit: QuantileSearchCriterion) -> Self {
        crit.is_inclusive()
    }
}
