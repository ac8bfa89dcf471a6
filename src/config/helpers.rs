use serde::{Deserialize, Deserializer, Serializer, de};
use std::time::Duration;
use url::Url;

/// Custom deserializer for Duration from milliseconds
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom deserializer for Duration from seconds
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Custom serializer for Duration to milliseconds
pub fn serialize_duration_to_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Custom serializer for Duration to seconds
pub fn serialize_duration_to_seconds<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

/// Custom deserializer for a single URL, kept as its string form once
/// validated.
pub fn deserialize_url_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Url::parse(&s).map_err(de::Error::custom)?;
    Ok(s)
}

/// Custom deserializer for log discriminators.
///
/// Discriminators use the full `u64` range, which YAML and environment
/// sources cannot always carry as integers, so decimal strings are accepted
/// alongside numbers. A single string may hold a comma-separated list, which
/// is how `FUEL_INDEXER__LOG_TYPES` arrives from the environment.
pub fn deserialize_log_types<'de, D>(deserializer: D) -> Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LogTypes {
        List(Vec<NumberOrString>),
        Single(NumberOrString),
    }

    fn parse<E: de::Error>(s: &str) -> Result<u64, E> {
        s.trim().parse().map_err(|e| de::Error::custom(format!("invalid log type '{s}': {e}")))
    }

    match LogTypes::deserialize(deserializer)? {
        LogTypes::List(values) => values
            .into_iter()
            .map(|value| match value {
                NumberOrString::Number(n) => Ok(n),
                NumberOrString::String(s) => parse(&s),
            })
            .collect(),
        LogTypes::Single(NumberOrString::Number(n)) => Ok(vec![n]),
        LogTypes::Single(NumberOrString::String(s)) => {
            s.split(',').filter(|item| !item.trim().is_empty()).map(parse).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestDurationMs {
        #[serde(
            deserialize_with = "deserialize_duration_from_ms",
            serialize_with = "serialize_duration_to_ms"
        )]
        duration: Duration,
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestDurationSecs {
        #[serde(
            deserialize_with = "deserialize_duration_from_seconds",
            serialize_with = "serialize_duration_to_seconds"
        )]
        duration: Duration,
    }

    #[test]
    fn test_deserialize_duration_from_ms() {
        let json = r#"{"duration": 5000}"#;
        let expected = TestDurationMs {
            duration: Duration::from_millis(5000),
        };
        let actual: TestDurationMs = serde_json::from_str(json).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_serialize_duration_to_ms() {
        let data = TestDurationMs {
            duration: Duration::from_millis(5000),
        };
        let expected = r#"{"duration":5000}"#;
        let actual = serde_json::to_string(&data).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_deserialize_duration_from_seconds() {
        let json = r#"{"duration": 5}"#;
        let expected = TestDurationSecs {
            duration: Duration::from_secs(5),
        };
        let actual: TestDurationSecs = serde_json::from_str(json).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_serialize_duration_to_seconds() {
        let data = TestDurationSecs {
            duration: Duration::from_secs(5),
        };
        let expected = r#"{"duration":5}"#;
        let actual = serde_json::to_string(&data).unwrap();
        assert_eq!(actual, expected);
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestLogTypes {
        #[serde(deserialize_with = "deserialize_log_types")]
        log_types: Vec<u64>,
    }

    #[test]
    fn test_deserialize_log_types_from_numbers_and_strings() {
        let json = r#"{"log_types": [42, "12195664052085097644"]}"#;
        let actual: TestLogTypes = serde_json::from_str(json).unwrap();
        assert_eq!(actual.log_types, vec![42, 12195664052085097644]);
    }

    #[test]
    fn test_deserialize_log_types_from_comma_separated_string() {
        let json = r#"{"log_types": "1, 12195664052085097644"}"#;
        let actual: TestLogTypes = serde_json::from_str(json).unwrap();
        assert_eq!(actual.log_types, vec![1, 12195664052085097644]);

        let json = r#"{"log_types": "6732614218709939873"}"#;
        let actual: TestLogTypes = serde_json::from_str(json).unwrap();
        assert_eq!(actual.log_types, vec![6732614218709939873]);

        let json = r#"{"log_types": 42}"#;
        let actual: TestLogTypes = serde_json::from_str(json).unwrap();
        assert_eq!(actual.log_types, vec![42]);
    }

    #[test]
    fn test_deserialize_log_types_rejects_garbage() {
        let json = r#"{"log_types": ["not-a-number"]}"#;
        let result: Result<TestLogTypes, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let json = r#"{"log_types": [-1]}"#;
        let result: Result<TestLogTypes, _> = serde_json::from_str(json);
        assert!(result.is_err());

        let json = r#"{"log_types": "1,two"}"#;
        let result: Result<TestLogTypes, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestUrl {
        #[serde(deserialize_with = "deserialize_url_string")]
        url: String,
    }

    #[test]
    fn test_deserialize_url_string() {
        let actual: TestUrl = serde_json::from_str(r#"{"url": "https://portal.example/fuel"}"#).unwrap();
        assert_eq!(actual.url, "https://portal.example/fuel");

        let result: Result<TestUrl, _> = serde_json::from_str(r#"{"url": "portal"}"#);
        assert!(result.is_err());
    }
}
