//! Serde helpers for configuration values

/// `Duration` as seconds in TOML: `http_timeout = 10` or `http_timeout = 2.5`
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Whole(u64),
        Fraction(f64),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Seconds::deserialize(deserializer)? {
            Seconds::Whole(secs) => Ok(Duration::from_secs(secs)),
            Seconds::Fraction(secs) if secs.is_finite() && secs >= 0.0 => {
                Ok(Duration::from_secs_f64(secs))
            }
            Seconds::Fraction(secs) => Err(serde::de::Error::custom(format!(
                "invalid number of seconds: {}",
                secs
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeouts {
        #[serde(with = "duration_secs")]
        timeout: Duration,
    }

    #[test]
    fn test_whole_and_fractional_seconds() {
        let t: Timeouts = toml::from_str("timeout = 3").unwrap();
        assert_eq!(t.timeout, Duration::from_secs(3));

        let t: Timeouts = toml::from_str("timeout = 2.5").unwrap();
        assert_eq!(t.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_negative_rejected() {
        assert!(toml::from_str::<Timeouts>("timeout = -1.0").is_err());
    }

    #[test]
    fn test_serialize_whole_seconds() {
        let json = serde_json::to_string(&Timeouts {
            timeout: Duration::from_secs(10),
        })
        .unwrap();
        assert_eq!(json, r#"{"timeout":10}"#);
    }
}
