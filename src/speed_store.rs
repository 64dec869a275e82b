// Persistence for the best speed seen per car/track/layout combination

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::errors::PenaltyError;

const STORE_DIR_NAME: &str = "pitlane-penalty";
const STORE_FILE_NAME: &str = "speed.json";

/// Trait defining the interface for the max speed store
pub trait SpeedStore {
    /// Load the stored max speed for a key, `None` if the key was never saved
    fn load_max_speed(&self, key: &str) -> Result<Option<f32>, PenaltyError>;

    /// Store the max speed for a key, keeping every other key
    fn save_max_speed(&mut self, key: &str, speed: f32) -> Result<(), PenaltyError>;
}

/// Reads the max speed for `key`, falling back to 0 when the store is missing or corrupt.
pub fn load_or_zero(store: &impl SpeedStore, key: &str) -> f32 {
    match store.load_max_speed(key) {
        Ok(Some(speed)) => speed,
        Ok(None) => {
            debug!("No max speed stored for {}", key);
            0.
        }
        Err(e) => {
            warn!("Could not read max speed for {}, starting from 0: {}", key, e);
            0.
        }
    }
}

/// Single JSON file mapping keys to speeds.
pub struct FileSpeedStore {
    path: PathBuf,
}

impl FileSpeedStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Create the store in the default application data directory
    pub fn new_default() -> Result<Self, PenaltyError> {
        Ok(Self::new(Self::default_store_path()?))
    }

    pub fn default_store_path() -> Result<PathBuf, PenaltyError> {
        let app_data_dir = dirs::data_dir().ok_or(PenaltyError::NoDataDir)?;
        Ok(app_data_dir.join(STORE_DIR_NAME).join(STORE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, f32>, PenaltyError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let file = File::open(&self.path).map_err(|e| PenaltyError::SpeedStoreIOError { source: e })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PenaltyError::SpeedStoreParseError { source: e })
    }
}

impl SpeedStore for FileSpeedStore {
    fn load_max_speed(&self, key: &str) -> Result<Option<f32>, PenaltyError> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn save_max_speed(&mut self, key: &str, speed: f32) -> Result<(), PenaltyError> {
        let mut speeds = match self.read_all() {
            Ok(speeds) => speeds,
            Err(e) => {
                warn!("Replacing unreadable speed store {:?}: {}", self.path, e);
                BTreeMap::new()
            }
        };
        speeds.insert(key.to_string(), (speed * 10.).round() / 10.);

        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| PenaltyError::SpeedStoreIOError { source: e })?;
            }
        }

        let file =
            File::create(&self.path).map_err(|e| PenaltyError::SpeedStoreIOError { source: e })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &speeds)
            .map_err(|e| PenaltyError::SpeedStoreParseError { source: e })?;
        writer
            .flush()
            .map_err(|e| PenaltyError::SpeedStoreIOError { source: e })?;

        debug!("Saved max speed {:.1} for {}", speed, key);
        Ok(())
    }
}
