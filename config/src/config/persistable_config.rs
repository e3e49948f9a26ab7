// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::config::{Error, StressConfig};
use serde::{Serialize, de::DeserializeOwned};
use std::{fs, path::Path};

/// A config that is read from and written to YAML files.
pub trait PersistableConfig: Serialize + DeserializeOwned {
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| Error::IO(path.display().to_string(), e))?;
        serde_yaml::from_str(&contents).map_err(|e| Error::Yaml(path.display().to_string(), e))
    }

    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let serialized =
            serde_yaml::to_string(self).map_err(|e| Error::Yaml(path.display().to_string(), e))?;
        fs::write(path, serialized).map_err(|e| Error::IO(path.display().to_string(), e))
    }

    fn parse_serialized_config(serialized_config: &str) -> Result<Self, Error> {
        serde_yaml::from_str(serialized_config).map_err(|e| Error::Yaml("config".to_string(), e))
    }
}

impl PersistableConfig for StressConfig {}
