//!
//! JSON persistence of fitted models
//!
use crate::error::Result;
use crate::params::ModelParams;
use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

///
/// Serialize any value as pretty JSON into the writer
///
pub fn write_json<W: Write, T: Serialize>(writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

pub fn read_json<R: Read, T: DeserializeOwned>(reader: R) -> Result<T> {
    Ok(serde_json::from_reader(reader)?)
}

///
/// Save parameters to a JSON file
///
pub fn save_params<P: AsRef<Path>>(path: P, params: &ModelParams) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_json(&mut writer, params)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

///
/// Load parameters from a JSON file. All invariants of `ModelParams` are
/// checked while deserializing.
///
pub fn load_params<P: AsRef<Path>>(path: P) -> Result<ModelParams> {
    read_json(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HmmError;
    use crate::hmm::mocks::mock_two_state_params;

    #[test]
    fn save_and_load_params() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = mock_two_state_params();
        save_params(&path, &params).unwrap();
        let loaded = load_params(&path).unwrap();
        assert_eq!(loaded.n_states(), 2);
        assert_abs_diff_eq!(loaded.trans(), params.trans(), epsilon = 1e-15);
        for k in 0..2 {
            assert_abs_diff_eq!(
                loaded.emission(k).cov(),
                params.emission(k).cov(),
                epsilon = 1e-15
            );
        }
    }
    #[test]
    fn invalid_params_are_rejected_on_load() {
        let text = r#"{"init":[0.7,0.7],"trans":[[1.0,0.0],[0.0,1.0]],"means":[[0.0],[1.0]],"covs":[[[1.0]],[[1.0]]]}"#;
        let r: Result<ModelParams> = read_json(text.as_bytes());
        assert!(matches!(r, Err(HmmError::Json(_))));
        let text = r#"{"init":[0.5,0.5],"trans":[[1.0,0.0],[0.0,1.0]],"means":[[0.0],[1.0]],"covs":[[[1.0]],[[-1.0]]]}"#;
        let r: Result<ModelParams> = read_json(text.as_bytes());
        assert!(r.is_err());
    }
}
