// This file is part of the terraform-provider-fastly project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::BTreeMap;

/// Changes between two collections of keyed elements
#[derive(Debug, PartialEq)]
pub struct SetDiff<'a, T> {
    pub added: Vec<&'a T>,
    pub modified: Vec<(&'a T, &'a T)>,
    pub deleted: Vec<&'a T>,
}

impl<'a, T: PartialEq> SetDiff<'a, T> {
    /// Split `old` and `new` by `key`
    ///
    /// Every list is ordered by key. When a key is repeated in one side, the last element wins.
    pub fn compute<K, F, O, N>(old: O, new: N, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K,
        O: IntoIterator<Item = &'a T>,
        N: IntoIterator<Item = &'a T>,
    {
        let old = old
            .into_iter()
            .map(|elt| (key(elt), elt))
            .collect::<BTreeMap<_, _>>();
        let mut new = new
            .into_iter()
            .map(|elt| (key(elt), elt))
            .collect::<BTreeMap<_, _>>();

        let mut diff = Self {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        };

        for (k, old_elt) in old {
            match new.remove(&k) {
                Some(new_elt) if new_elt != old_elt => diff.modified.push((old_elt, new_elt)),
                Some(_) => (),
                None => diff.deleted.push(old_elt),
            }
        }
        diff.added.extend(new.into_values());

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Changes between two string maps
#[derive(Debug, Default, PartialEq)]
pub struct MapDiff<'a> {
    pub added: Vec<(&'a str, &'a str)>,
    pub modified: Vec<(&'a str, &'a str)>,
    pub deleted: Vec<&'a str>,
}

impl<'a> MapDiff<'a> {
    pub fn compute<O, N>(old: O, new: N) -> Self
    where
        O: IntoIterator<Item = (&'a str, &'a str)>,
        N: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let old = old.into_iter().collect::<BTreeMap<_, _>>();
        let new = new.into_iter().collect::<BTreeMap<_, _>>();

        let mut diff = Self::default();
        for (&k, &v) in &new {
            match old.get(k) {
                None => diff.added.push((k, v)),
                Some(&prev) if prev != v => diff.modified.push((k, v)),
                Some(_) => (),
            }
        }
        diff.deleted = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .copied()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}
