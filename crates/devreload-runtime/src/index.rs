//! Component index
//!
//! Diagnostic dump of the live component registry, rewritten after every
//! start. Purely advisory: callers ignore failures.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use devreload_kernel::RegistrySerializer;

/// Write the registry contents to `path`, creating parent directories
pub fn write_component_index(
    serializer: &dyn RegistrySerializer,
    path: &Path,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serializer.write_registry(&mut writer)?;
    writer.flush()
}
