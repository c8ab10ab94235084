//! Unit tests for `ResolutionConfig` loading
//!
//! Environment tests are serialized because they mutate process state.

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use serial_test::serial;
    use sqlresolve::config::{ConfigError, ResolutionConfig};
    use test_case::test_case;

    const DEPTH_VAR: &str = "SQLRESOLVE_MAX_NESTING_DEPTH";
    const ITERATIONS_VAR: &str = "SQLRESOLVE_MAX_REWRITE_ITERATIONS";

    fn clear_env() {
        std::env::remove_var(DEPTH_VAR);
        std::env::remove_var(ITERATIONS_VAR);
    }

    #[test]
    #[serial]
    fn test_from_env_uses_defaults() {
        clear_env();
        let config = ResolutionConfig::from_env().unwrap();
        assert_eq!(config, ResolutionConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_limits() {
        clear_env();
        std::env::set_var(DEPTH_VAR, "8");
        std::env::set_var(ITERATIONS_VAR, "16");

        let config = ResolutionConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.max_nesting_depth, 8);
        assert_eq!(config.max_rewrite_iterations, 16);
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage() {
        clear_env();
        std::env::set_var(DEPTH_VAR, "deep");

        let result = ResolutionConfig::from_env();
        clear_env();

        match result {
            Err(ConfigError::Parse { field, value, .. }) => {
                assert_eq!(field, DEPTH_VAR);
                assert_eq!(value, "deep");
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test_case(0, 64 => false ; "zero depth")]
    #[test_case(1, 1 => true ; "minimum limits")]
    #[test_case(10000, 10000 => true ; "maximum limits")]
    #[test_case(64, 10001 => false ; "too many iterations")]
    fn test_limits_are_validated(depth: u32, iterations: u32) -> bool {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_nesting_depth: {}", depth).unwrap();
        writeln!(file, "max_rewrite_iterations: {}", iterations).unwrap();

        ResolutionConfig::from_yaml_file(file.path()).is_ok()
    }

    #[test]
    fn test_yaml_file_fills_missing_fields_with_defaults() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "max_nesting_depth: 5")?;

        let config = ResolutionConfig::from_yaml_file(file.path())?;
        assert_eq!(config.max_nesting_depth, 5);
        assert_eq!(config.max_rewrite_iterations, 64);
        Ok(())
    }

    #[test]
    fn test_missing_yaml_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ResolutionConfig::from_yaml_file(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
