//! Programmer string parsing

use std::collections::HashMap;

use crate::RegistryError;

/// Parsed programmer parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Value of a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Reject any parameter not in `known`
    pub fn check_known(&self, known: &[&str]) -> Result<(), RegistryError> {
        let mut keys: Vec<&String> = self.params.keys().collect();
        keys.sort();
        match keys.into_iter().find(|k| !known.contains(&k.as_str())) {
            Some(key) => Err(RegistryError::UnknownParam {
                programmer: self.name.clone(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_programmer_params("dummy:emulate=W25Q128.V")?;
/// assert_eq!(params.name, "dummy");
/// assert_eq!(params.get("emulate"), Some("W25Q128.V"));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, RegistryError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            match opt.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    params.insert(key.to_string(), value.to_string());
                }
                _ => return Err(RegistryError::InvalidParam(opt.to_string())),
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_only() {
        let params = parse_programmer_params("dummy").unwrap();
        assert_eq!(params.name, "dummy");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_with_params() {
        let params = parse_programmer_params("dummy:emulate=MX25L8006E,hwwp=yes").unwrap();
        assert_eq!(params.get("emulate"), Some("MX25L8006E"));
        assert_eq!(params.get("hwwp"), Some("yes"));
        assert_eq!(params.get("image"), None);
    }

    #[test]
    fn test_invalid_param() {
        assert!(matches!(
            parse_programmer_params("dummy:emulate"),
            Err(RegistryError::InvalidParam(p)) if p == "emulate"
        ));
        assert!(matches!(
            parse_programmer_params("dummy:=x"),
            Err(RegistryError::InvalidParam(_))
        ));
    }

    #[test]
    fn test_unknown_param() {
        let params = parse_programmer_params("dummy:speed=1,bus=spi").unwrap();
        assert!(matches!(
            params.check_known(&["bus"]),
            Err(RegistryError::UnknownParam { key, .. }) if key == "speed"
        ));
        params.check_known(&["bus", "speed"]).unwrap();
    }
}
