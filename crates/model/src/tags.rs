use indexmap::IndexMap;

/// OSM tag map. Values may be semicolon-joined multi-values
/// (`highway=bus_stop;platform`); matching always checks the single atoms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(IndexMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Adds `value` under `key`, semicolon-joining it to a present value.
    pub fn append(&mut self, key: &str, value: &str) {
        match self.0.get_mut(key) {
            Some(present) => {
                present.push(';');
                present.push_str(value);
            }
            None => {
                self.0.insert(key.to_owned(), value.to_owned());
            }
        }
    }

    /// True if any single value stored under `key` equals `value`.
    pub fn has(&self, key: &str, value: &str) -> bool {
        match self.0.get(key) {
            Some(present) if !present.is_empty() => {
                present == value || present.split(';').any(|atom| atom == value)
            }
            _ => false,
        }
    }

    /// The single value atoms stored under `key`.
    pub fn atoms<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> {
        self.0
            .get(key)
            .map(String::as_str)
            .into_iter()
            .flat_map(|value| value.split(';'))
    }

    /// True if any value is a semicolon-joined multi-value.
    pub fn multiple_values(&self) -> bool {
        self.0.values().any(|value| value.contains(';'))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Tags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Tags {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_matches_plain_value() {
        let tags: Tags = [("highway", "bus_stop")].into_iter().collect();
        assert!(tags.has("highway", "bus_stop"));
        assert!(!tags.has("highway", "platform"));
        assert!(!tags.has("railway", "platform"));
    }

    #[test]
    fn has_matches_multi_value_atoms() {
        let tags: Tags = [("highway", "bus_stop;platform")].into_iter().collect();
        assert!(tags.has("highway", "bus_stop"));
        assert!(tags.has("highway", "platform"));
        assert!(!tags.has("highway", "bus"));
        assert!(tags.multiple_values());
    }

    #[test]
    fn empty_value_never_matches() {
        let tags: Tags = [("layer", "")].into_iter().collect();
        assert!(!tags.has("layer", ""));
    }

    #[test]
    fn append_joins_with_semicolon() {
        let mut tags = Tags::new();
        tags.append("layer", "1");
        assert_eq!(tags.get("layer"), Some("1"));
        assert!(!tags.multiple_values());
        tags.append("layer", "2");
        assert_eq!(tags.get("layer"), Some("1;2"));
        assert!(tags.multiple_values());
        assert_eq!(tags.atoms("layer").collect::<Vec<_>>(), vec!["1", "2"]);
    }
}
