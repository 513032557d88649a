use crate::error::{ReleaseError, Result};
use crate::git::RefSnapshot;
use git2::{BranchType, ErrorCode, Oid, Repository as Git2Repo};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Mutex<Git2Repo>,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository::from_git2(repo))
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository {
            repo: Mutex::new(repo),
        }
    }

    fn with_repo<T>(&self, f: impl FnOnce(&Git2Repo) -> Result<T>) -> Result<T> {
        let repo = self
            .repo
            .lock()
            .map_err(|_| ReleaseError::Git(git2::Error::from_str("repository lock poisoned")))?;
        f(&repo)
    }
}

fn short(oid: Option<Oid>) -> String {
    oid.map_or_else(|| "(missing)".to_string(), |o| o.to_string())
}

impl super::Repository for Git2Repository {
    fn read_refs(&self) -> Result<RefSnapshot> {
        self.with_repo(|repo| {
            let mut snapshot = RefSnapshot::default();

            for reference in repo.references_glob("refs/tags/*")? {
                let reference = reference?;
                let Some(name) = reference.shorthand().map(str::to_string) else {
                    continue;
                };
                // tags on trees or blobs cannot take part in a release
                match reference.peel_to_commit() {
                    Ok(commit) => {
                        snapshot.tags.insert(name, commit.id());
                    }
                    Err(e) => debug!(tag = %name, error = %e, "skipping tag without a commit"),
                }
            }

            for branch in repo.branches(Some(BranchType::Local))? {
                let (branch, _) = branch?;
                let Some(name) = branch.name()?.map(str::to_string) else {
                    continue;
                };
                let commit = branch.get().peel_to_commit()?;
                snapshot.branches.insert(name, commit.id());
            }

            Ok(snapshot)
        })
    }

    fn resolve_commit(&self, revision: &str) -> Result<Oid> {
        self.with_repo(|repo| {
            let commit = repo.revparse_single(revision)?.peel_to_commit()?;
            Ok(commit.id())
        })
    }

    fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        self.with_repo(|repo| Ok(repo.graph_descendant_of(descendant, ancestor)?))
    }

    fn create_tag(&self, name: &str, target: Oid) -> Result<()> {
        self.with_repo(|repo| {
            let object = repo.find_object(target, None)?;

            match repo.tag_lightweight(name, &object, false) {
                Ok(_) => Ok(()),
                Err(e) if e.code() == ErrorCode::Exists => {
                    let existing = repo
                        .find_reference(&format!("refs/tags/{}", name))
                        .and_then(|r| r.peel_to_commit())
                        .map(|c| c.id())
                        .ok();
                    Err(ReleaseError::TagConflict {
                        tag: name.to_string(),
                        existing: short(existing),
                        requested: target.to_string(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn update_branch(&self, name: &str, expected: Option<Oid>, target: Oid) -> Result<()> {
        self.with_repo(|repo| {
            let refname = format!("refs/heads/{}", name);
            let message = format!("tag-release: move {} to {}", name, target);

            let outcome = match expected {
                None => repo.reference(&refname, target, false, &message),
                Some(current) => repo.reference_matching(&refname, target, true, current, &message),
            };

            match outcome {
                Ok(_) => Ok(()),
                Err(e) if matches!(e.code(), ErrorCode::Exists | ErrorCode::Modified) => {
                    let current = repo
                        .find_reference(&refname)
                        .ok()
                        .and_then(|r| r.target());
                    Err(ReleaseError::NonLinearHistory {
                        branch: name.to_string(),
                        current: short(current),
                        target: target.to_string(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn push_refs(&self, remote: &str, refspecs: &[String]) -> Result<()> {
        self.with_repo(|repo| {
            let mut remote_handle = repo
                .find_remote(remote)
                .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

            let rejected = Mutex::new(Vec::new());
            let mut callbacks = git2::RemoteCallbacks::new();
            callbacks.credentials(|_url, username_from_url, allowed_types| {
                let username = username_from_url.unwrap_or("git");
                if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                    if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                        return Ok(cred);
                    }
                    if let Some(home) = dirs::home_dir() {
                        for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                            let path = home.join(".ssh").join(key);
                            if path.exists() {
                                return git2::Cred::ssh_key(username, None, &path, None);
                            }
                        }
                    }
                }
                git2::Cred::default()
            });

            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    if let Ok(mut rejected) = rejected.lock() {
                        rejected.push(format!("{} ({})", refname, status));
                    }
                }
                Ok(())
            });

            let mut push_options = git2::PushOptions::new();
            push_options.remote_callbacks(callbacks);

            let refspec_strs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
            remote_handle
                .push(&refspec_strs, Some(&mut push_options))
                .map_err(|e| ReleaseError::remote(format!("Push to '{}' failed: {}", remote, e)))?;
            drop(push_options);

            let rejected = rejected.into_inner().unwrap_or_default();
            if !rejected.is_empty() {
                return Err(ReleaseError::remote(format!(
                    "Remote '{}' rejected: {}",
                    remote,
                    rejected.join(", ")
                )));
            }

            Ok(())
        })
    }
}
