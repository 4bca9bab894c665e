//! Generic parameters functions
//!
//! Parameters are TOML files. Execs look them up by name in the `params` directory of the
//! software root, tools and tests can point at an explicit file instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::host;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot locate the parameter directory: {0}")]
    SwRootNotSet(host::HostError),

    #[error("Cannot load the parmeter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$MOWER_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = host::get_mower_sw_root().map_err(LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_from_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_from_path<P, Q>(path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>,
{
    let params_str = read_to_string(path.as_ref())
        .map_err(|e| LoadError::FileLoadError(path.as_ref().to_path_buf(), e))?;

    from_str(&params_str)
}

/// Parse parameters from a TOML string.
pub fn from_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestParams {
        gain: f64,
        #[serde(default)]
        enabled: bool,
    }

    #[test]
    fn test_from_str() {
        let p: TestParams = from_str("gain = 0.3\n").unwrap();
        assert_eq!(
            p,
            TestParams {
                gain: 0.3,
                enabled: false
            }
        );

        assert!(matches!(
            from_str::<TestParams>("gain = \"high\""),
            Err(LoadError::DeserialiseError(_))
        ));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(&path, "gain = 1.5\nenabled = true\n").unwrap();

        let p: TestParams = load_from_path(&path).unwrap();
        assert_eq!(p.gain, 1.5);
        assert!(p.enabled);

        assert!(matches!(
            load_from_path::<TestParams, _>(dir.path().join("missing.toml")),
            Err(LoadError::FileLoadError(..))
        ));
    }
}
