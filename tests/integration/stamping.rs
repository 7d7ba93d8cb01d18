//! Version stamping across a simulated build step.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use shipwright::patch::{MarkedRegion, VersionStamp};
use shipwright::{Error, Result};

const SERVER_MODULE: &str = "\
\"\"\"The server application.\"\"\"

# BEGIN VERSION BLOCK
VERSION = 'tip'
VERSION_NAME = \"DEVELOPMENT MODE\"
API_VERSION = 'dev'
# END VERSION BLOCK

import os
";

fn release_stamp() -> VersionStamp {
    VersionStamp {
        number: "0.9a3".to_string(),
        name: "Edison".to_string(),
        api: "4".to_string(),
    }
}

fn fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_build_step_sees_stamped_file_and_tree_is_restored() {
    let dir = TempDir::new().unwrap();
    let module = fixture(&dir, "__init__.py", SERVER_MODULE);
    let packaged = dir.path().join("package.txt");

    let region = MarkedRegion::python(&module).unwrap();
    region
        .stamped(&release_stamp(), || {
            // A stand-in for the packaging tool: it reads the module the way
            // an sdist would and bakes the stamped version into its output.
            let content = fs::read_to_string(&module)?;
            assert!(content.contains("VERSION = '0.9a3'"));
            assert!(content.contains("VERSION_NAME = \"Edison\""));
            fs::write(&packaged, &content)?;
            Ok(())
        })
        .unwrap();

    // The packaged artifact keeps the release version; the tree does not.
    assert!(fs::read_to_string(&packaged).unwrap().contains("0.9a3"));
    assert_eq!(fs::read_to_string(&module).unwrap(), SERVER_MODULE);
}

#[test]
fn test_failed_build_step_still_restores() {
    let dir = TempDir::new().unwrap();
    let module = fixture(&dir, "__init__.py", SERVER_MODULE);

    let region = MarkedRegion::python(&module).unwrap();
    let result: Result<()> = region.stamped(&release_stamp(), || {
        Err(Error::ExternalTool {
            command: "python setup.py sdist".to_string(),
            status: "exit status: 1".to_string(),
        })
    });

    assert!(matches!(result, Err(Error::ExternalTool { .. })));
    assert_eq!(fs::read_to_string(&module).unwrap(), SERVER_MODULE);
}

#[test]
fn test_nested_stamping_of_two_files() {
    // dist stamps the server module, and inside that bracket the embedded
    // build stamps the client module. Both must come back untouched.
    let client_module = "\
// BEGIN VERSION BLOCK
exports.versionNumber = 'tip';
exports.versionCodename = 'development';
exports.apiVersion = 'dev';
// END VERSION BLOCK
";
    let dir = TempDir::new().unwrap();
    let server = fixture(&dir, "__init__.py", SERVER_MODULE);
    let client = fixture(&dir, "index.js", client_module);

    let server_region = MarkedRegion::python(&server).unwrap();
    let client_region = MarkedRegion::javascript(&client).unwrap();
    let stamp = release_stamp();

    server_region
        .stamped(&stamp, || {
            client_region.stamped(&stamp, || {
                assert!(fs::read_to_string(&server)?.contains("'0.9a3'"));
                assert!(fs::read_to_string(&client)?
                    .contains("exports.versionCodename = 'Edison';"));
                Ok(())
            })
        })
        .unwrap();

    assert_eq!(fs::read_to_string(&server).unwrap(), SERVER_MODULE);
    assert_eq!(fs::read_to_string(&client).unwrap(), client_module);
}

#[test]
fn test_interrupted_cycle_leaves_stamp_until_restore() {
    // When the process dies between apply and restore, the stamped bytes are
    // on disk; a later restore with the saved capture still recovers them.
    let dir = TempDir::new().unwrap();
    let module = fixture(&dir, "__init__.py", SERVER_MODULE);

    let region = MarkedRegion::python(&module).unwrap();
    let capture = region.apply(&release_stamp()).unwrap();
    assert!(fs::read_to_string(&module).unwrap().contains("0.9a3"));

    region.restore(&capture).unwrap();
    assert_eq!(fs::read_to_string(&module).unwrap(), SERVER_MODULE);
}
