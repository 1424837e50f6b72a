use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Агент (booker): код служит логином и ключом атрибуции броней и расходов.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Agent {
    pub code: String,
    pub name: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub pin_hash: Option<String>,
}

impl Agent {
    // Коды сравниваются без учета регистра: ks101 == KS101
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_match_ignores_case_and_padding() {
        let agent = Agent {
            code: "KS101".into(),
            name: "Karim".into(),
            phone: None,
            pin_hash: None,
        };
        assert!(agent.matches_code("ks101"));
        assert!(agent.matches_code(" Ks101 "));
        assert!(!agent.matches_code("ks102"));
    }

    #[test]
    fn pin_hash_is_never_serialized() {
        let agent = Agent {
            code: "KS101".into(),
            name: "Karim".into(),
            phone: None,
            pin_hash: Some("$2b$04$secret".into()),
        };
        let json = serde_json::to_string(&agent).unwrap();
        assert!(!json.contains("secret"));
    }
}
