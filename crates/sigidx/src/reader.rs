//! Random access across many signal files.
//!
//! Files are registered by file name. A file whose index already exists on
//! disk is not opened until it is first queried; a file without one is opened
//! and indexed at registration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;

use sigidx_error::{Result, SigIdxError};
use sigidx_index::{fetch_raw, plan_order};
use sigidx_store::OpenStore;
use sigidx_types::ReadId;
use tracing::{debug, error, info, warn};

use crate::build::collect_data_files;
use crate::config::{ReaderConfig, index_path_for};
use crate::session::{IndexSession, parse_read_id};

#[derive(Debug)]
struct RegisteredFile<S> {
    data_path: PathBuf,
    index_path: PathBuf,
    session: Option<IndexSession<S>>,
}

impl<S: OpenStore> RegisteredFile<S> {
    fn session(&mut self) -> Result<&IndexSession<S>> {
        if self.session.is_none() {
            let mut session = IndexSession::open(&self.data_path)?;
            session.load_index(&self.index_path)?;
            debug!(
                path = %self.data_path.display(),
                index = %self.index_path.display(),
                "deferred index loaded"
            );
            self.session = Some(session);
        }
        self.session
            .as_ref()
            .ok_or_else(|| SigIdxError::internal("session missing after load"))
    }
}

/// Keyed access to reads across a set of registered signal files.
#[derive(Debug)]
pub struct RandomAccessReader<S> {
    config: ReaderConfig,
    files: BTreeMap<String, RegisteredFile<S>>,
}

impl<S: OpenStore> RandomAccessReader<S> {
    pub fn new(config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            files: BTreeMap::new(),
        })
    }

    pub const fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Register one data file; returns the name it is registered under.
    ///
    /// Registering a second file with the same name replaces the first.
    pub fn add_file(&mut self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                SigIdxError::config(format!("{} has no usable file name", path.display()))
            })?
            .to_owned();
        let index_path = index_path_for(path, &self.config.index_suffix);

        let session = if index_path.is_file() {
            debug!(
                path = %path.display(),
                index = %index_path.display(),
                "index found, load deferred"
            );
            None
        } else {
            Some(self.build_session(path, &index_path)?)
        };

        let previous = self.files.insert(
            name.clone(),
            RegisteredFile {
                data_path: path.to_path_buf(),
                index_path,
                session,
            },
        );
        if let Some(previous) = previous {
            warn!(
                name = %name,
                replaced = %previous.data_path.display(),
                "file name registered twice, keeping the latest"
            );
        }
        Ok(name)
    }

    fn build_session(&self, path: &Path, index_path: &Path) -> Result<IndexSession<S>> {
        let mut session = IndexSession::open(path)?;
        let entries = session.build_index()?.len();
        info!(path = %path.display(), entries, "built index on registration");
        if !self.config.save_index {
            return Ok(session);
        }
        if let Err(err) = session.save_index(index_path) {
            warn!(
                index = %index_path.display(),
                error = %err,
                "could not save index, keeping it in memory only"
            );
        }
        Ok(session)
    }

    /// Register every data file under `dir`, recursively.
    pub fn add_dir(&mut self, dir: &Path) -> Result<Vec<String>> {
        let paths = collect_data_files(dir, &self.config)?;
        if paths.is_empty() {
            warn!(
                dir = %dir.display(),
                extension = %self.config.data_extension,
                "no data files found"
            );
        }
        paths.iter().map(|path| self.add_file(path)).collect()
    }

    /// Registered file names, sorted.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    fn registered(&mut self, name: &str) -> Result<&mut RegisteredFile<S>> {
        self.files
            .get_mut(name)
            .ok_or_else(|| SigIdxError::config(format!("file {name:?} is not registered")))
    }

    fn file(&mut self, name: &str) -> Result<&IndexSession<S>> {
        self.registered(name)?.session()
    }

    /// Read ids of one file, in physical order when `sorted`.
    pub fn list_read_ids(&mut self, file: &str, sorted: bool) -> Result<Vec<ReadId>> {
        let session = self.file(file)?;
        if sorted {
            session.list_read_ids_sorted()
        } else {
            session.list_read_ids()
        }
    }

    /// Every `(file name, read id)` pair, file by file in name order and in
    /// physical order within each file.
    pub fn iter_read_ids(&mut self) -> Result<impl Iterator<Item = (String, ReadId)> + use<S>> {
        let mut all = Vec::new();
        for (name, file) in &mut self.files {
            let ids = file.session()?.list_read_ids_sorted()?;
            all.extend(ids.into_iter().map(|read_id| (name.clone(), read_id)));
        }
        Ok(all.into_iter())
    }

    pub fn calibration(&mut self, file: &str, read_id: impl AsRef<str>) -> Result<(f32, f32)> {
        self.file(file)?.calibration(read_id)
    }

    pub fn signal_length(&mut self, file: &str, read_id: impl AsRef<str>) -> Result<u32> {
        self.file(file)?.signal_length(read_id)
    }

    pub fn fetch_signal(&mut self, file: &str, read_id: impl AsRef<str>) -> Result<Vec<i16>> {
        self.file(file)?.fetch_signal(read_id)
    }

    pub fn fetch_calibrated_signal(
        &mut self,
        file: &str,
        read_id: impl AsRef<str>,
    ) -> Result<Vec<f32>> {
        self.file(file)?.fetch_calibrated_signal(read_id)
    }

    /// Permutation of `items` grouping reads by file (files in name order)
    /// and by physical position within each file.
    pub fn plan_fetch_order<F: AsRef<str>>(&mut self, items: &[(F, ReadId)]) -> Result<Vec<usize>> {
        let mut starts = Vec::with_capacity(items.len());
        for (file, read_id) in items {
            let loc = self.file(file.as_ref())?.index()?.location(read_id)?;
            starts.push(loc.start);
        }
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| {
            items[a]
                .0
                .as_ref()
                .cmp(items[b].0.as_ref())
                .then(starts[a].cmp(&starts[b]))
        });
        Ok(order)
    }

    /// Fetch many reads of one file on `fetch_workers` threads.
    ///
    /// Reads are planned into physical order and split into contiguous
    /// chunks; each worker opens its own store handle. Results come back in
    /// input order, and any failure fails the whole call.
    pub fn fetch_signals_parallel<I>(&mut self, file: &str, read_ids: I) -> Result<Vec<Vec<i16>>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let read_ids: Vec<ReadId> = read_ids
            .into_iter()
            .map(parse_read_id)
            .collect::<Result<_>>()?;
        let workers = self.config.fetch_workers.clamp(1, read_ids.len().max(1));
        let registered = self.registered(file)?;
        let data_path = registered.data_path.clone();
        let session = registered.session()?;
        if workers == 1 {
            return session.fetch_signals_by_id(&read_ids);
        }
        let index = session.index()?;
        let order = plan_order(index, &read_ids)?;

        let chunk_len = order.len().div_ceil(workers);
        debug!(file, reads = read_ids.len(), workers, "parallel fetch");
        let fetched = thread::scope(|scope| {
            let handles: Vec<_> = order
                .chunks(chunk_len)
                .map(|chunk| {
                    let data_path = data_path.as_path();
                    let read_ids = read_ids.as_slice();
                    scope.spawn(move || -> Result<Vec<(usize, Vec<i16>)>> {
                        let store = S::open(data_path)?;
                        chunk
                            .iter()
                            .map(|&position| {
                                let loc = index.location(&read_ids[position])?;
                                Ok((position, fetch_raw(&store, loc)?))
                            })
                            .collect()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .map_err(|_| SigIdxError::internal("fetch worker panicked"))?
                })
                .collect::<Result<Vec<_>>>()
        })
        .inspect_err(|err| {
            error!(file, error = %err, "parallel fetch failed");
        })?;

        let mut signals = vec![Vec::new(); read_ids.len()];
        for (position, signal) in fetched.into_iter().flatten() {
            signals[position] = signal;
        }
        Ok(signals)
    }
}
