// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};

/// One page of a larger collection.
///
/// `has_more == offset + limit < total` and
/// `items.len() == max(0, min(limit, total - offset))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub items: Vec<T>,
}

impl<T: Clone> PaginatedResponse<T> {
    /// Page through a slice
    pub fn from_slice(all: &[T], offset: usize, limit: usize) -> Self {
        Self::page(all.iter().cloned(), all.len(), offset, limit)
    }
}

impl<T> PaginatedResponse<T> {
    /// Page through an iterator of known length
    pub fn page<I>(all: I, total: usize, offset: usize, limit: usize) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self {
            total,
            offset,
            limit,
            has_more: offset.saturating_add(limit) < total,
            items,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResponse<U> {
        PaginatedResponse {
            total: self.total,
            offset: self.offset,
            limit: self.limit,
            has_more: self.has_more,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
