/// Create an empty scratch directory that is removed when dropped.
#[allow(dead_code)]
pub fn scratch_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("fontmerge-test")
        .tempdir()
        .expect("unable to create scratch directory")
}
