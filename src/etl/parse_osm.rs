use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use crate::UserConfig;
use crate::data::OsmMapData;
use crate::errors::{Error, ErrorKind, Result};
use crate::etl::assembler::assemble;
use crate::etl::tag_events::{open_osm_file, OsmReader, TagEventSource};
use crate::etl::Etl;

pub const ETL_NAME: &str = "parse_osm";
pub const OUTPUT_FILE_NAME: &str = "osm_elements.rkyv";

pub struct ParseOsmEtl<'a> {
    config: &'a UserConfig,
}

impl ParseOsmEtl<'_> {
    fn output_path(dir: &Path) -> PathBuf {
        dir.join(OUTPUT_FILE_NAME)
    }

    pub fn new(config: &UserConfig) -> ParseOsmEtl<'_> {
        ParseOsmEtl {
            config
        }
    }
}

impl Etl for ParseOsmEtl<'_> {
    type Input = TagEventSource<OsmReader>;
    type Output = OsmMapData;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn is_cached(&self, dir: &Path) -> Result<bool> {
        Ok(Self::output_path(dir).try_exists()?)
    }

    fn clean(&self, dir: &Path) -> Result<()> {
        if self.is_cached(dir)? {
            fs::remove_file(Self::output_path(dir))?;
        }
        Ok(())
    }

    fn extract(&mut self, _dir: &Path) -> Result<Self::Input> {
        open_osm_file(Path::new(&self.config.data_path))
    }

    fn transform(&mut self, input: Self::Input) -> Result<Self::Output> {
        let map = assemble(input)?;
        info!(nodes = map.get_nodes().len(), ways = map.get_ways().len(); "Parsed map data");
        map.attribute_analysis();
        Ok(map)
    }

    fn load(&mut self, dir: &Path, output: Self::Output) -> Result<()> {
        let bytes = rkyv::to_bytes::<_, 256>(&output)
            .map_err(|err| Error::new(ErrorKind::Cache, format!("Could not serialize map cache: {err:?}")))?;
        // Renamed over the target once complete.
        let mut output_file = NamedTempFile::new_in(dir)?;
        output_file.write_all(&bytes)?;
        output_file.persist(Self::output_path(dir)).map_err(|err| Error::from(err.error))?;
        Ok(())
    }
}
