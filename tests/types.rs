// ABOUTME: Integration tests for type-safe identifiers and validated types.
// ABOUTME: Tests alias validation, correlation IDs, and ID serialization.

use diskpush::types::*;

mod disk_alias_tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        let alias = DiskAlias::new("fedora-40 root").unwrap();
        assert_eq!(alias.as_str(), "fedora-40 root");
        assert_eq!(alias.to_string(), "fedora-40 root");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(DiskAlias::new(""), Err(DiskAliasError::Empty));
    }

    #[test]
    fn rejects_surrounding_whitespace() {
        assert_eq!(
            DiskAlias::new(" root"),
            Err(DiskAliasError::SurroundingWhitespace)
        );
    }

    #[test]
    fn rejects_control_characters() {
        assert_eq!(
            DiskAlias::new("root\ndisk"),
            Err(DiskAliasError::ControlChar('\n'))
        );
    }

    #[test]
    fn length_limit_counts_characters() {
        assert!(DiskAlias::new(&"é".repeat(255)).is_ok());
        assert_eq!(
            DiskAlias::new(&"a".repeat(256)),
            Err(DiskAliasError::TooLong)
        );
    }

    #[test]
    fn parses_from_str() {
        let alias: DiskAlias = "data".parse().unwrap();
        assert_eq!(alias.as_str(), "data");
    }
}

mod correlation_id_tests {
    use super::*;

    #[test]
    fn prefixes_sanitized_alias() {
        let alias = DiskAlias::new("web/01 root.img").unwrap();
        assert_eq!(
            CorrelationId::for_upload(&alias).as_str(),
            "image_transfer_web_01_root_img"
        );
    }

    #[test]
    fn is_deterministic() {
        let alias = DiskAlias::new("db-data_2").unwrap();
        assert_eq!(
            CorrelationId::for_upload(&alias),
            CorrelationId::for_upload(&alias)
        );
        assert_eq!(
            CorrelationId::for_upload(&alias).to_string(),
            "image_transfer_db-data_2"
        );
    }
}

mod id_tests {
    use super::*;

    #[test]
    fn serializes_as_plain_string() {
        let id = DiskId::new("123e4567");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""123e4567""#);
    }

    #[test]
    fn deserializes_from_plain_string() {
        let id: StorageDomainId = serde_json::from_str(r#""sd-1""#).unwrap();
        assert_eq!(id.as_str(), "sd-1");
    }

    #[test]
    fn equal_values_are_equal() {
        assert_eq!(TransferId::new("t1"), TransferId::new("t1"));
        assert_ne!(TransferId::new("t1"), TransferId::new("t2"));
    }
}
