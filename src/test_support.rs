//! Loose object writer for unit tests; the crate itself never writes objects

use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::io::Write;
use std::path::Path;

/// Deflate `object` into `<objects_dir>/xx/yyyy...`
pub(crate) fn write_loose(objects_dir: &Path, object: &Object) -> ObjectId {
    let object_path = objects_dir.join(object.id().to_path());
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&object.serialize()).unwrap();

    std::fs::create_dir_all(object_path.parent().unwrap()).unwrap();
    std::fs::write(&object_path, encoder.finish().unwrap()).unwrap();

    object.id().clone()
}
