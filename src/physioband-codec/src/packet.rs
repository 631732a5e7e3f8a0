use std::collections::HashMap;

use crate::{
    CodecError,
    constants::{FIELD_DELIMITER, KEY_VALUE_SEPARATOR, REQUIRED_KEYS},
};

/// Field code to raw value, as sent by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: HashMap<String, String>,
}

impl FieldMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every required field code is present.
    pub fn is_complete(&self) -> bool {
        REQUIRED_KEYS.iter().all(|key| self.fields.contains_key(*key))
    }

    pub fn missing(&self) -> Vec<&'static str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !self.fields.contains_key(*key))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Splits a trimmed packet line into its `key=value` fields.
///
/// Tokens without `=` and tokens with an empty key are ignored, and a
/// repeated key keeps its last value. A line that yields no field at all is
/// rejected as malformed.
pub fn parse_packet(line: &str) -> Result<FieldMap, CodecError> {
    let mut fields = HashMap::new();

    for token in line.split(FIELD_DELIMITER) {
        let Some((key, value)) = token.split_once(KEY_VALUE_SEPARATOR) else {
            trace!("Ignoring token without separator: {:?}", token);
            continue;
        };

        if key.is_empty() {
            warn!("Ignoring token without field code: {:?}", token);
            continue;
        }

        fields.insert(key.to_owned(), value.to_owned());
    }

    if fields.is_empty() {
        return Err(CodecError::MalformedPacket(line.to_owned()));
    }

    Ok(FieldMap { fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_packet() {
        let map = parse_packet("aX=16384|aY=0|aZ=-5|gX=1.5|gY=0|gZ=0").unwrap();
        assert!(map.is_complete());
        assert_eq!(map.len(), 6);
        assert_eq!(map.get("aX"), Some("16384"));
        assert_eq!(map.get("aZ"), Some("-5"));
        assert_eq!(map.get("gX"), Some("1.5"));
    }

    #[test]
    fn tokens_without_separator_are_ignored() {
        let map = parse_packet("aX=1|aY=2|bogus|gZ=3").unwrap();
        assert_eq!(map.len(), 3);
        assert!(!map.is_complete());
        assert_eq!(map.missing(), vec!["aZ", "gX", "gY"]);
    }

    #[test]
    fn value_keeps_everything_after_first_separator() {
        let map = parse_packet("note=a=b|aX=1").unwrap();
        assert_eq!(map.get("note"), Some("a=b"));
    }

    #[test]
    fn extra_fields_do_not_affect_completeness() {
        let map = parse_packet("t=991|aX=0|aY=0|aZ=0|gX=0|gY=0|gZ=0|temp=31.2").unwrap();
        assert!(map.is_complete());
        assert_eq!(map.get("temp"), Some("31.2"));
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let map = parse_packet("aX=1|aX=2").unwrap();
        assert_eq!(map.get("aX"), Some("2"));
    }

    #[test]
    fn line_without_fields_is_malformed() {
        let result = parse_packet("hello from esp32");
        assert_eq!(
            result,
            Err(CodecError::MalformedPacket("hello from esp32".to_owned()))
        );
    }

    #[test]
    fn empty_key_token_is_ignored() {
        let map = parse_packet("aX=1|=5|gZ=3").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("aX"), Some("1"));
        assert_eq!(map.get("gZ"), Some("3"));
    }

    #[test]
    fn complete_packet_survives_stray_empty_key() {
        let map = parse_packet("aX=32768|aY=0|aZ=0|gX=0|gY=0|gZ=0|=junk").unwrap();
        assert!(map.is_complete());
        assert_eq!(map.get(""), None);
    }

    #[test]
    fn only_empty_keys_is_malformed() {
        assert!(parse_packet("=5|=6").is_err());
    }

    #[test]
    fn non_numeric_values_are_kept_verbatim() {
        let map = parse_packet("aX=abc|aY=0|aZ=0|gX=0|gY=0|gZ=0").unwrap();
        assert!(map.is_complete());
        assert_eq!(map.get("aX"), Some("abc"));
    }

    #[test]
    fn collects_from_pairs() {
        let map = [("aX", "1"), ("gZ", "2")].into_iter().collect::<FieldMap>();
        assert_eq!(map.get("gZ"), Some("2"));
        assert_eq!(map.iter().count(), 2);
    }
}
