//! Image collection: ingestion, resolution groups, selection, crop size.
//!
//! # State and derived values
//!
//! [`ImageCollection`] owns the ordered list of [`ImageItem`]s. Everything
//! else is derived from it:
//!
//! - **Groups** bucket items by exact `width×height`, ordered by the first
//!   appearance of each key. [`ImageCollection::groups`] recomputes them on
//!   every call, so grouping the same collection twice is identical.
//! - **Selection** is a set of checked group keys. An empty set means *all*
//!   groups. It is seeded with every key exactly once, when a mutation takes
//!   the collection from empty to non-empty. Keys that stop naming a group
//!   are pruned. When a remote item's real size arrives, a checked
//!   placeholder key is carried over to the item's new key first, so the
//!   selection never collapses to "all" behind the user's back.
//! - **Crop dimensions** are the component-wise minimum over all items,
//!   recomputed by every mutation that leaves the collection non-empty.
//!   Clearing keeps the last value.
//!
//! # Display handles
//!
//! A local file gets a `local:` display URL from the [`HandleRegistry`],
//! the equivalent of a browser object URL. Handles are released exactly once:
//! on [`clear`](ImageCollection::clear) or when
//! [`replace_local_with_remote_urls`](ImageCollection::replace_local_with_remote_urls)
//! swaps in a CDN URL.
//!
//! # Async ingestion
//!
//! [`CollectionManager`] wraps the collection in `Arc<Mutex<_>>` next to a
//! [`DimensionProbe`]. The lock is never held across an `.await`: probes run
//! first, then results are applied in one short critical section. Remote
//! items are patched by item id, so a probe that resolves after `clear()`
//! finds nothing and is dropped.

use crate::imaging::{Dimensions, min_dimensions};
use crate::probe::{DimensionProbe, ImageSource, LocalFile};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

/// Size assumed for a remote image until its probe resolves.
pub const PLACEHOLDER_DIMENSIONS: Dimensions = Dimensions::new(224, 224);

const LOCAL_SCHEME: &str = "local:";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Crop dimensions must be positive, got {0}")]
    InvalidCropDimensions(Dimensions),
}

/// Group key for a resolution, e.g. `"1080×1920"`.
pub fn group_key(width: u32, height: u32) -> String {
    format!("{width}×{height}")
}

/// Allocates and releases `local:` display URLs.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next: u64,
    live: HashSet<String>,
}

impl HandleRegistry {
    pub fn allocate(&mut self, file: &LocalFile) -> String {
        self.next += 1;
        let url = format!("{LOCAL_SCHEME}{}/{}", self.next, file.file_name());
        self.live.insert(url.clone());
        url
    }

    /// Returns `false` if the handle was never allocated or already released.
    pub fn release(&mut self, url: &str) -> bool {
        self.live.remove(url)
    }

    pub fn is_local(url: &str) -> bool {
        url.starts_with(LOCAL_SCHEME)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// One ingested image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageItem {
    id: u64,
    /// `None` for images added by URL.
    pub source: Option<LocalFile>,
    pub display_url: String,
    pub width: u32,
    pub height: u32,
}

impl ImageItem {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn group_key(&self) -> String {
        group_key(self.width, self.height)
    }

    pub fn is_local(&self) -> bool {
        self.source.is_some()
    }

    /// Where to load the full image from.
    pub fn image_source(&self) -> ImageSource {
        match &self.source {
            Some(file) => ImageSource::Local(file.path.clone()),
            None => ImageSource::Remote(self.display_url.clone()),
        }
    }
}

/// Items sharing one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: String,
    pub items: Vec<ImageItem>,
}

/// Bucket items by exact resolution, preserving first-appearance order.
pub fn group_by_resolution(items: &[ImageItem]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        let key = item.group_key();
        match index.get(&key) {
            Some(&i) => groups[i].items.push(item.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    items: vec![item.clone()],
                });
            }
        }
    }
    groups
}

#[derive(Debug)]
pub struct ImageCollection {
    items: Vec<ImageItem>,
    next_id: u64,
    handles: HandleRegistry,
    selection: BTreeSet<String>,
    crop: Dimensions,
    placeholder: Dimensions,
}

impl Default for ImageCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::with_placeholder(PLACEHOLDER_DIMENSIONS)
    }

    /// Remote items start at `placeholder`; it is also the initial crop size.
    pub fn with_placeholder(placeholder: Dimensions) -> Self {
        Self {
            items: Vec::new(),
            next_id: 0,
            handles: HandleRegistry::default(),
            selection: BTreeSet::new(),
            crop: placeholder,
            placeholder,
        }
    }

    pub fn items(&self) -> &[ImageItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn groups(&self) -> Vec<Group> {
        group_by_resolution(&self.items)
    }

    /// Checked group keys. Empty means every group is shown.
    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selection.is_empty() || self.selection.contains(key)
    }

    /// Items of the selected groups, group by group.
    pub fn preview_items(&self) -> Vec<ImageItem> {
        self.groups()
            .into_iter()
            .filter(|g| self.is_selected(&g.key))
            .flat_map(|g| g.items)
            .collect()
    }

    pub fn crop_dimensions(&self) -> Dimensions {
        self.crop
    }

    /// Manual override; the next mutation that adds or patches items recomputes it.
    pub fn set_crop_dimensions(&mut self, crop: Dimensions) -> Result<(), CollectionError> {
        if crop.width == 0 || crop.height == 0 {
            return Err(CollectionError::InvalidCropDimensions(crop));
        }
        self.crop = crop;
        Ok(())
    }

    /// Flip one group key. Unknown keys are ignored.
    pub fn toggle_group(&mut self, key: &str) {
        if !self.groups().iter().any(|g| g.key == key) {
            return;
        }
        if !self.selection.remove(key) {
            self.selection.insert(key.to_string());
        }
    }

    /// Replace the selection with the given keys, keeping only known groups.
    pub fn select_groups<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known: HashSet<String> = self.groups().into_iter().map(|g| g.key).collect();
        self.selection = keys
            .into_iter()
            .map(Into::into)
            .filter(|k| known.contains(k))
            .collect();
    }

    pub fn live_handles(&self) -> usize {
        self.handles.live_count()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append probed local files in the given order.
    pub fn append_local(&mut self, probed: Vec<(LocalFile, Dimensions)>) -> usize {
        if probed.is_empty() {
            return 0;
        }
        let was_empty = self.is_empty();
        let count = probed.len();
        for (file, dims) in probed {
            let id = self.next_id();
            let display_url = self.handles.allocate(&file);
            self.items.push(ImageItem {
                id,
                source: Some(file),
                display_url,
                width: dims.width,
                height: dims.height,
            });
        }
        self.after_change(was_empty);
        count
    }

    /// Append a remote item with placeholder dimensions and return its id.
    pub fn push_remote_placeholder(&mut self, url: &str) -> u64 {
        let was_empty = self.is_empty();
        let id = self.next_id();
        self.items.push(ImageItem {
            id,
            source: None,
            display_url: url.to_string(),
            width: self.placeholder.width,
            height: self.placeholder.height,
        });
        self.after_change(was_empty);
        id
    }

    /// Patch the real size into item `id`. Returns `false` if it is gone.
    pub fn patch_dimensions(&mut self, id: u64, dims: Dimensions) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        let old_key = item.group_key();
        item.width = dims.width;
        item.height = dims.height;
        let new_key = item.group_key();
        // A checked placeholder group stays checked under its real size.
        if old_key != new_key && self.selection.contains(&old_key) {
            self.selection.insert(new_key);
        }
        self.after_change(false);
        true
    }

    /// Release every display handle, drop all items, reset the selection.
    pub fn clear(&mut self) {
        for item in self.items.drain(..) {
            if HandleRegistry::is_local(&item.display_url) {
                self.handles.release(&item.display_url);
            }
        }
        self.selection.clear();
    }

    /// Swap local display URLs for published ones.
    ///
    /// Replaced items lose their local source; their handles are released.
    /// Returns how many items were replaced.
    pub fn replace_local_with_remote_urls(&mut self, urls: &HashMap<String, String>) -> usize {
        let mut replaced = 0;
        for item in &mut self.items {
            let Some(remote) = urls.get(&item.display_url) else {
                continue;
            };
            if HandleRegistry::is_local(&item.display_url) {
                self.handles.release(&item.display_url);
            }
            item.display_url = remote.clone();
            item.source = None;
            replaced += 1;
        }
        replaced
    }

    fn after_change(&mut self, was_empty: bool) {
        let Some((width, height)) = min_dimensions(self.items.iter().map(|i| (i.width, i.height)))
        else {
            return;
        };
        self.crop = Dimensions::new(width, height);

        let keys: Vec<String> = self.groups().into_iter().map(|g| g.key).collect();
        if was_empty {
            self.selection = keys.into_iter().collect();
        } else {
            self.selection.retain(|k| keys.contains(k));
        }
    }
}

fn lock(state: &Mutex<ImageCollection>) -> MutexGuard<'_, ImageCollection> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared collection plus the prober that feeds it.
pub struct CollectionManager<P> {
    state: Arc<Mutex<ImageCollection>>,
    prober: P,
}

impl<P> CollectionManager<P>
where
    P: DimensionProbe + Clone + Send + Sync + 'static,
{
    pub fn new(prober: P) -> Self {
        Self::with_collection(prober, ImageCollection::new())
    }

    pub fn with_collection(prober: P, collection: ImageCollection) -> Self {
        Self {
            state: Arc::new(Mutex::new(collection)),
            prober,
        }
    }

    /// Run `f` against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&ImageCollection) -> R) -> R {
        f(&lock(&self.state))
    }

    /// Mutate the state directly (selection, crop override).
    pub fn update<R>(&self, f: impl FnOnce(&mut ImageCollection) -> R) -> R {
        f(&mut lock(&self.state))
    }

    /// Probe image files concurrently and append the ones that decode.
    ///
    /// Non-image media types are skipped; probe failures are dropped silently.
    /// The appended order always matches `files`, however the probes finish.
    /// Returns the number of items added.
    pub async fn add_local_files(&self, files: Vec<LocalFile>) -> usize {
        let candidates: Vec<LocalFile> = files.into_iter().filter(LocalFile::is_image).collect();
        if candidates.is_empty() {
            return 0;
        }

        let mut slots: Vec<Option<Dimensions>> = vec![None; candidates.len()];
        let mut pending: FuturesUnordered<_> = candidates
            .iter()
            .enumerate()
            .map(|(index, file)| async move {
                (index, self.prober.probe_local(&file.path).await)
            })
            .collect();

        while let Some((index, result)) = pending.next().await {
            match result {
                Ok(dims) => slots[index] = Some(dims),
                Err(err) => {
                    debug!(path = %candidates[index].path.display(), %err, "Dropping unreadable image")
                }
            }
        }
        drop(pending);

        let probed: Vec<(LocalFile, Dimensions)> = candidates
            .into_iter()
            .zip(slots)
            .filter_map(|(file, dims)| dims.map(|d| (file, d)))
            .collect();
        lock(&self.state).append_local(probed)
    }

    /// Append `url` immediately with placeholder dimensions.
    ///
    /// Returns `None` for a blank URL. Otherwise returns a future that probes
    /// the real size and patches the item; await it or spawn it. A failed probe
    /// leaves the placeholder in place.
    pub fn add_remote_image(
        &self,
        url: &str,
    ) -> Option<impl Future<Output = ()> + Send + use<P>> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let id = lock(&self.state).push_remote_placeholder(url);

        let state = Arc::clone(&self.state);
        let prober = self.prober.clone();
        let url = url.to_string();
        Some(async move {
            match prober.probe_remote(&url).await {
                Ok(dims) => {
                    if !lock(&state).patch_dimensions(id, dims) {
                        debug!(%url, "Item removed before probe resolved");
                    }
                }
                Err(err) => debug!(%url, %err, "Remote probe failed, keeping placeholder"),
            }
        })
    }

    pub fn clear(&self) {
        lock(&self.state).clear();
    }
}
