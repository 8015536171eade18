use std::{
    collections::HashMap,
    fmt,
};

use serde::{
    de::{
        MapAccess,
        Visitor,
    },
    ser::SerializeMap,
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use tracing::warn;

fn default_weight() -> f64 {
    1.0
}

/// One keyword and how strongly it matters, in [0.0, 1.0] for explicit interests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestEntry {
    pub keyword: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl InterestEntry {
    pub fn new(keyword: impl Into<String>, weight: f64) -> Self {
        Self { keyword: keyword.into(), weight }
    }
}

/// Server-inferred keyword weights, kept in the order the backend sent them.
///
/// Serialized as a JSON object. Ordering matters for the top-N tie break, so
/// entries live in a list with a keyword index beside it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplicitInterests {
    entries: Vec<(String, f64)>,
    index: HashMap<String, usize>,
}

impl ImplicitInterests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An overwritten keyword keeps its original position.
    /// Non-finite weights are ignored and reported as `false`.
    pub fn insert(&mut self, keyword: impl Into<String>, weight: f64) -> bool {
        if !weight.is_finite() {
            return false;
        }
        let keyword = keyword.into();
        match self.index.get(&keyword) {
            Some(&i) => self.entries[i].1 = weight,
            None => {
                self.index.insert(keyword.clone(), self.entries.len());
                self.entries.push((keyword, weight));
            }
        }
        true
    }

    pub fn get(&self, keyword: &str) -> Option<f64> {
        self.index.get(keyword).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.index.contains_key(keyword)
    }

    pub fn retain<F: FnMut(&str, f64) -> bool>(&mut self, mut keep: F) {
        let before = self.entries.len();
        self.entries.retain(|(k, w)| keep(k, *w));
        if self.entries.len() != before {
            self.index =
                self.entries.iter().enumerate().map(|(i, (k, _))| (k.clone(), i)).collect();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, w)| (k.as_str(), *w))
    }

    /// The `n` heaviest entries, heaviest first. Equal weights keep backend order.
    pub fn top(&self, n: usize) -> Vec<InterestEntry> {
        let mut ranked: Vec<&(String, f64)> = self.entries.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().take(n).map(|(k, w)| InterestEntry::new(k.clone(), *w)).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for ImplicitInterests {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut interests = ImplicitInterests::new();
        for (keyword, weight) in iter {
            interests.insert(keyword, weight);
        }
        interests
    }
}

impl Serialize for ImplicitInterests {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (keyword, weight) in &self.entries {
            map.serialize_entry(keyword, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ImplicitInterests {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = ImplicitInterests;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping keywords to weights")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut interests = ImplicitInterests::new();
                while let Some((keyword, weight)) = access.next_entry::<String, f64>()? {
                    if !interests.insert(keyword, weight) {
                        warn!(weight, "Dropping implicit interest with a non-finite weight");
                    }
                }
                Ok(interests)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Profile-shaped body returned by every profile route.
///
/// Routes only guarantee the sub-collections they touch, so each field is optional.
/// Older stored profiles carry implicit weights under `interests`, sometimes
/// alongside `implicit_interests`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfilePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_interests: Option<Vec<InterestEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_interests: Option<ImplicitInterests>,
    #[serde(default, rename = "interests", skip_serializing)]
    pub legacy_interests: Option<ImplicitInterests>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_exclusions: Option<Vec<String>>,
}

impl ProfilePayload {
    /// Implicit weights, preferring `implicit_interests` over the legacy key.
    pub fn implicit(&self) -> Option<&ImplicitInterests> {
        self.implicit_interests.as_ref().or(self.legacy_interests.as_ref())
    }

    pub fn take_implicit(&mut self) -> Option<ImplicitInterests> {
        let legacy = self.legacy_interests.take();
        self.implicit_interests.take().or(legacy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddExplicitRequest {
    pub user_id: String,
    pub keyword: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordRequest {
    pub user_id: String,
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkUpdateRequest {
    pub user_id: String,
    pub updates: Vec<InterestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRequest {
    pub user_id: String,
}
