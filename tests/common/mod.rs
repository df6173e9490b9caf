#![allow(dead_code)]

use async_trait::async_trait;
use cocoons_ftp::client::{FtpSession, RemoteEntry};
use cocoons_ftp::error::{DeployError, DeployResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A remote node of the in-memory server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(Vec<u8>),
    Dir,
}

/// FTP commands received by the in-memory server, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Connect,
    List(String),
    Dele(String),
    Rmd(String),
    Mkd(String),
    Stor(String),
    Quit,
}

#[derive(Debug, Default)]
struct ServerState {
    tree: BTreeMap<String, Node>,
    ops: Vec<Op>,
    connected: bool,
    panic_on_upload: bool,
}

/// In-memory FTP server keeping the rules real servers enforce: a
/// directory must be empty to be removed, a parent must exist to create or
/// store anything below it.
#[derive(Clone)]
pub struct MemoryServer {
    state: Arc<Mutex<ServerState>>,
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(".", |(parent, _)| parent)
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

impl MemoryServer {
    pub fn new() -> Self {
        let mut state = ServerState::default();
        state.tree.insert(".".to_string(), Node::Dir);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tree
            .insert(path.to_string(), Node::Dir);
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .tree
            .insert(path.to_string(), Node::File(content.as_bytes().to_vec()));
        self
    }

    /// Makes every STOR panic, as a crashing transfer would
    pub fn panicking_on_upload(self) -> Self {
        self.state.lock().unwrap().panic_on_upload = true;
        self
    }

    pub fn session(&self) -> Box<dyn FtpSession> {
        Box::new(MemorySession {
            state: self.state.clone(),
        })
    }

    /// Every remote node except the root
    pub fn snapshot(&self) -> BTreeMap<String, Node> {
        let mut tree = self.state.lock().unwrap().tree.clone();
        tree.remove(".");
        tree
    }

    pub fn paths(&self) -> Vec<String> {
        self.snapshot().into_keys().collect()
    }

    pub fn has_root(&self) -> bool {
        self.state.lock().unwrap().tree.get(".") == Some(&Node::Dir)
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn position(&self, op: &Op) -> Option<usize> {
        self.ops().iter().position(|o| o == op)
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

struct MemorySession {
    state: Arc<Mutex<ServerState>>,
}

impl MemorySession {
    fn exec<T>(
        &self,
        op: Op,
        f: impl FnOnce(&mut BTreeMap<String, Node>) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err("not connected".to_string());
        }
        state.ops.push(op);
        f(&mut state.tree)
    }
}

#[async_trait]
impl FtpSession for MemorySession {
    async fn connect(&mut self) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.connected = true;
        state.ops.push(Op::Connect);
        Ok(())
    }

    async fn list(&mut self, path: &str) -> DeployResult<Vec<RemoteEntry>> {
        self.exec(Op::List(path.to_string()), |tree| {
            if tree.get(path) != Some(&Node::Dir) {
                return Err("550 No such directory".to_string());
            }
            Ok(tree
                .iter()
                .filter(|(p, _)| p.as_str() != "." && parent_of(p) == path)
                .map(|(p, node)| match node {
                    Node::Dir => RemoteEntry::directory(name_of(p)),
                    Node::File(_) => RemoteEntry::file(name_of(p)),
                })
                .collect())
        })
        .map_err(|reason| DeployError::List {
            path: path.to_string(),
            reason,
        })
    }

    async fn delete_file(&mut self, path: &str) -> DeployResult<()> {
        self.exec(Op::Dele(path.to_string()), |tree| match tree.get(path) {
            Some(Node::File(_)) => {
                tree.remove(path);
                Ok(())
            }
            _ => Err("550 No such file".to_string()),
        })
        .map_err(|reason| DeployError::Delete {
            path: path.to_string(),
            reason,
        })
    }

    async fn remove_directory(&mut self, path: &str) -> DeployResult<()> {
        self.exec(Op::Rmd(path.to_string()), |tree| {
            if tree.get(path) != Some(&Node::Dir) {
                return Err("550 No such directory".to_string());
            }
            if tree.keys().any(|p| p != "." && parent_of(p) == path) {
                return Err("550 Directory not empty".to_string());
            }
            tree.remove(path);
            Ok(())
        })
        .map_err(|reason| DeployError::RemoveDirectory {
            path: path.to_string(),
            reason,
        })
    }

    async fn create_directory(&mut self, path: &str) -> DeployResult<()> {
        self.exec(Op::Mkd(path.to_string()), |tree| {
            if tree.get(parent_of(path)) != Some(&Node::Dir) {
                return Err("550 Parent directory missing".to_string());
            }
            if tree.contains_key(path) {
                return Err("550 File exists".to_string());
            }
            tree.insert(path.to_string(), Node::Dir);
            Ok(())
        })
        .map_err(|reason| DeployError::CreateDirectory {
            path: path.to_string(),
            reason,
        })
    }

    async fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> DeployResult<u64> {
        let content = fs::read(local_path);
        if self.state.lock().unwrap().panic_on_upload {
            panic!("transfer of {} crashed", remote_path);
        }
        self.exec(Op::Stor(remote_path.to_string()), |tree| {
            let content = content.map_err(|e| e.to_string())?;
            if tree.get(parent_of(remote_path)) != Some(&Node::Dir) {
                return Err("553 Parent directory missing".to_string());
            }
            if tree.get(remote_path) == Some(&Node::Dir) {
                return Err("553 Is a directory".to_string());
            }
            let size = content.len() as u64;
            tree.insert(remote_path.to_string(), Node::File(content));
            Ok(size)
        })
        .map_err(|reason| DeployError::Upload {
            from: local_path.to_path_buf(),
            to: remote_path.to_string(),
            reason,
        })
    }

    async fn disconnect(&mut self) -> DeployResult<()> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Quit);
        state.connected = false;
        Ok(())
    }
}

/// A site folder with its `cocoons.json`
pub struct TestSite {
    pub root: TempDir,
}

impl TestSite {
    pub fn new(config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("cocoons.json"), config).unwrap();
        fs::create_dir(root.path().join("target")).unwrap();
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.root.path().join("target").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn mkdir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.root.path().join("target").join(relative)).unwrap();
        self
    }

    /// The remote tree a deployment of `target/` should produce
    pub fn expected_remote(&self) -> BTreeMap<String, Node> {
        let mut tree = BTreeMap::new();
        collect(&self.root.path().join("target"), ".", &mut tree);
        tree
    }
}

fn collect(dir: &Path, remote: &str, tree: &mut BTreeMap<String, Node>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().into_string().unwrap();
        if name.starts_with('.') {
            continue;
        }
        let remote_path = format!("{}/{}", remote, name);
        if entry.file_type().unwrap().is_dir() {
            tree.insert(remote_path.clone(), Node::Dir);
            collect(&entry.path(), &remote_path, tree);
        } else {
            tree.insert(remote_path, Node::File(fs::read(entry.path()).unwrap()));
        }
    }
}

pub const PLAIN_CONFIG: &str = r#"{
    "ftp": {"host": "ftp.example.com", "port": 21, "user": "deploy", "password": "secret"}
}"#;

pub const CLEAN_CONFIG: &str = r#"{
    "ftp": {"host": "ftp.example.com", "port": 21, "user": "deploy", "password": "secret",
            "folder": "www", "deleteExistingFiles": true},
    "htaccess": {"generate": true}
}"#;
