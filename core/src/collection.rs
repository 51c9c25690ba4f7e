//! Lazily-loaded, page-cached view over a remote resource list.
//!
//! # Design
//! The collection separates the page the caller is looking at (the current
//! page pointer) from everything it has ever fetched (the object cache).
//! A page is requested from the `Repository` only when a read needs it and it
//! is missing from the page index, so paging back and forth over visited
//! pages costs nothing.
//!
//! Metadata is whatever the last successful fetch reported. A failed fetch
//! leaves every field exactly as it was, so retrying is always safe.
//!
//! The collection is single-threaded. Wrap it in a `Mutex` to share it, since
//! a read is a check-then-fetch-then-write sequence.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Index;
use std::sync::Arc;

use crate::error::{ApiError, CollectionError};
use crate::model::ApiObject;
use crate::repository::Repository;
use crate::types::{PageMeta, PageResult, PageStatus};

/// Identifier type of the objects a repository yields.
pub type ObjectId<R> = <<R as Repository>::Object as ApiObject>::Id;

/// Page-cached collection bound to one repository for its whole life.
///
/// `collection[i]` reads the current page only if it is already loaded and
/// panics otherwise; unlike `get_by_index` it cannot fetch, because `Index`
/// only gets `&self`.
#[derive(Debug)]
pub struct ObjectCollection<R: Repository> {
    repository: R,
    objects: HashMap<ObjectId<R>, Arc<R::Object>>,
    pages: BTreeMap<u32, Vec<ObjectId<R>>>,
    metadata: Option<PageMeta>,
    current_page: u32,
}

impl<R: Repository> ObjectCollection<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            objects: HashMap::new(),
            pages: BTreeMap::new(),
            metadata: None,
            current_page: 1,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    // ----- current page pointer -----

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Move to the next page. Nothing is fetched until the next read.
    pub fn increase_page(&mut self) {
        self.current_page = self.current_page.saturating_add(1);
    }

    pub fn set_current_page(&mut self, page: u32) -> Result<(), CollectionError> {
        if page == 0 {
            return Err(CollectionError::InvalidPage(page));
        }
        self.current_page = page;
        Ok(())
    }

    // ----- reads -----

    /// Objects of the current page in server order, fetching the page first
    /// if it has not been loaded.
    pub fn objects(&mut self) -> Result<Vec<Arc<R::Object>>, CollectionError> {
        let page = self.current_page;
        self.ensure_page(page)?;
        Ok(self.page_objects(page))
    }

    /// The `index`-th object of the current page, fetching the page if needed.
    pub fn get_by_index(&mut self, index: usize) -> Result<Arc<R::Object>, CollectionError> {
        let page = self.current_page;
        self.ensure_page(page)?;
        let len = self.pages.get(&page).map_or(0, Vec::len);
        self.loaded_at(index)
            .cloned()
            .ok_or(CollectionError::IndexOutOfRange { index, len })
    }

    /// Cache lookup only; never fetches.
    pub fn get(&self, id: &ObjectId<R>) -> Result<Arc<R::Object>, CollectionError> {
        self.objects
            .get(id)
            .cloned()
            .ok_or_else(|| CollectionError::NotFound { id: id.to_string() })
    }

    /// The `index`-th object of the current page if that page is loaded.
    pub fn get_loaded(&self, index: usize) -> Option<&R::Object> {
        self.loaded_at(index).map(|object| &**object)
    }

    pub fn exists(&self, id: &ObjectId<R>) -> bool {
        self.objects.contains_key(id)
    }

    pub fn contains(&self, object: &R::Object) -> bool {
        self.exists(&object.id())
    }

    /// Total reported by the server, or 0 before the first fetch.
    pub fn count(&self) -> u64 {
        self.metadata.map_or(0, |meta| meta.total)
    }

    /// Load every page not yet in the index and return all cached objects,
    /// ordered by page number and then by each page's server order.
    ///
    /// An object listed on several pages is returned once, at its first
    /// position. The current page pointer is left untouched. If a fetch fails
    /// part-way, pages loaded before the failure stay cached.
    pub fn to_vec(&mut self) -> Result<Vec<Arc<R::Object>>, CollectionError> {
        if self.metadata.is_none() {
            let page = self.current_page;
            self.load_page(page)?;
        }

        let mut page = 1;
        while page <= self.total_pages() {
            self.ensure_page(page)?;
            page += 1;
        }
        tracing::debug!(
            pages = self.pages.len(),
            objects = self.objects.len(),
            "collection fully loaded"
        );

        let mut seen = HashSet::with_capacity(self.objects.len());
        let mut all = Vec::with_capacity(self.objects.len());
        for id in self.pages.values().flatten() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(object) = self.objects.get(id) {
                all.push(Arc::clone(object));
            }
        }
        Ok(all)
    }

    /// Forget every cached object and page. Metadata, the initialized state
    /// and the current page pointer survive.
    pub fn clear(&mut self) {
        tracing::debug!(
            pages = self.pages.len(),
            objects = self.objects.len(),
            "clearing collection cache"
        );
        self.objects.clear();
        self.pages.clear();
    }

    // ----- load state -----

    pub fn is_initialized(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn is_page_loaded(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    pub fn is_object_loaded(&self, id: &ObjectId<R>) -> bool {
        self.exists(id)
    }

    /// True once every page in `1..=meta.pages` has been fetched since the
    /// last `clear`.
    pub fn is_fully_loaded(&self) -> bool {
        match self.metadata {
            Some(meta) => (1..=meta.pages).all(|page| self.pages.contains_key(&page)),
            None => false,
        }
    }

    pub fn metadata(&self) -> Option<PageMeta> {
        self.metadata
    }

    /// Number of distinct objects currently cached.
    pub fn loaded_len(&self) -> usize {
        self.objects.len()
    }

    // ----- fetching -----

    fn total_pages(&self) -> u32 {
        self.metadata.map_or(0, |meta| meta.pages)
    }

    fn ensure_page(&mut self, page: u32) -> Result<(), CollectionError> {
        if self.pages.contains_key(&page) {
            return Ok(());
        }
        self.load_page(page)
    }

    fn load_page(&mut self, page: u32) -> Result<(), CollectionError> {
        let result = self.repository.fetch_page(page).map_err(|err| {
            tracing::warn!(page, error = %err, "page fetch failed");
            err
        })?;
        let PageResult {
            status,
            meta,
            objects,
        } = result;
        if let PageStatus::Error(code) = status {
            tracing::warn!(page, status = %code, "page fetch returned error status");
            return Err(ApiError::Status(code).into());
        }

        let mut ids = Vec::with_capacity(objects.len());
        for object in objects {
            let id = object.id();
            ids.push(id.clone());
            self.objects.insert(id, Arc::new(object));
        }
        tracing::debug!(
            page,
            fetched = ids.len(),
            total = meta.total,
            pages = meta.pages,
            "page loaded"
        );
        self.pages.insert(page, ids);
        self.metadata = Some(meta);
        Ok(())
    }

    fn page_objects(&self, page: u32) -> Vec<Arc<R::Object>> {
        self.pages
            .get(&page)
            .map(|ids| ids.iter().filter_map(|id| self.objects.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn loaded_at(&self, index: usize) -> Option<&Arc<R::Object>> {
        let id = self.pages.get(&self.current_page)?.get(index)?;
        self.objects.get(id)
    }
}

/// Non-fetching positional access into the current page.
///
/// Panics if the current page is not loaded or `index` is past its end; call
/// `objects` or `get_by_index` first to load the page.
impl<R: Repository> Index<usize> for ObjectCollection<R> {
    type Output = R::Object;

    fn index(&self, index: usize) -> &R::Object {
        match self.get_loaded(index) {
            Some(object) => object,
            None => panic!(
                "index {index} out of range for loaded page {}",
                self.current_page
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::Channel;

    /// Page-addressed repository that counts fetches and can fail on demand.
    #[derive(Default)]
    struct FakeRepository {
        pages: Mutex<HashMap<u32, PageResult<Channel>>>,
        fail_next: Mutex<Option<ApiError>>,
        calls: Mutex<Vec<u32>>,
    }

    impl FakeRepository {
        fn set_page(&self, page: u32, meta: PageMeta, ids: &[u64]) {
            let objects = ids.iter().map(|&id| channel(id)).collect();
            self.pages
                .lock()
                .unwrap()
                .insert(page, PageResult::ok(meta, objects));
        }

        fn fail_next(&self, err: ApiError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Repository for FakeRepository {
        type Object = Channel;

        fn fetch_page(&self, page: u32) -> Result<PageResult<Channel>, ApiError> {
            self.calls.lock().unwrap().push(page);
            if let Some(err) = self.fail_next.lock().unwrap().take() {
                return Err(err);
            }
            self.pages
                .lock()
                .unwrap()
                .get(&page)
                .cloned()
                .ok_or(ApiError::NotFound)
        }
    }

    fn channel(id: u64) -> Channel {
        Channel {
            id,
            url: "http://site.channel.com".to_string(),
            name: format!("Channel {id}"),
        }
    }

    fn meta(page: u32) -> PageMeta {
        PageMeta {
            total: 3,
            page,
            pages: 2,
            limit: 2,
        }
    }

    /// total=3, limit=2: page 1 holds {1,2}, page 2 holds {3}.
    fn collection() -> ObjectCollection<FakeRepository> {
        let repo = FakeRepository::default();
        repo.set_page(1, meta(1), &[1, 2]);
        repo.set_page(2, meta(2), &[3]);
        ObjectCollection::new(repo)
    }

    fn ids(objects: &[Arc<Channel>]) -> Vec<u64> {
        objects.iter().map(|c| c.id).collect()
    }

    #[test]
    fn fresh_collection_has_loaded_nothing() {
        let c = collection();
        assert!(!c.is_initialized());
        assert!(!c.is_object_loaded(&1));
        assert!(!c.is_page_loaded(1));
        assert!(!c.is_fully_loaded());
        assert_eq!(c.count(), 0);
        assert_eq!(c.current_page(), 1);
        assert_eq!(c.loaded_len(), 0);
        assert!(c.metadata().is_none());
        assert!(c.repository().calls().is_empty());
    }

    #[test]
    fn first_page_load() {
        let mut c = collection();
        let objects = c.objects().unwrap();

        assert_eq!(ids(&objects), vec![1, 2]);
        assert!(c.is_initialized());
        assert!(c.is_object_loaded(&1));
        assert!(c.is_page_loaded(1));
        assert_eq!(c.count(), 3);
        assert!(!c.is_fully_loaded());
        assert_eq!(c.metadata(), Some(meta(1)));
        assert!(!c.is_object_loaded(&3));
        assert!(!c.is_page_loaded(2));
    }

    #[test]
    fn same_page_reads_fetch_once() {
        let mut c = collection();
        let first = c.objects().unwrap();
        let second = c.objects().unwrap();
        assert_eq!(first, second);
        assert_eq!(c.repository().calls(), vec![1]);
    }

    #[test]
    fn second_page_completes_collection() {
        let mut c = collection();
        c.objects().unwrap();
        c.increase_page();
        assert!(!c.is_page_loaded(2));

        let objects = c.objects().unwrap();
        assert_eq!(ids(&objects), vec![3]);
        assert!(c.is_page_loaded(2));
        assert!(c.is_fully_loaded());
        assert_eq!(c.count(), 3);
        assert_eq!(c.repository().calls(), vec![1, 2]);
    }

    #[test]
    fn revisiting_a_page_uses_the_cache() {
        let mut c = collection();
        c.objects().unwrap();
        c.increase_page();
        c.objects().unwrap();
        c.set_current_page(1).unwrap();

        assert_eq!(ids(&c.objects().unwrap()), vec![1, 2]);
        assert_eq!(c.repository().calls(), vec![1, 2]);
    }

    #[test]
    fn lookups_never_fetch() {
        let mut c = collection();
        assert!(!c.exists(&1));
        assert!(matches!(c.get(&1), Err(CollectionError::NotFound { .. })));
        assert!(c.repository().calls().is_empty());

        let first = c.objects().unwrap()[0].clone();
        assert!(c.exists(&first.id));
        assert!(c.contains(&first));
        assert_eq!(c.get(&first.id).unwrap(), first);
        assert_eq!(
            c.get(&99).unwrap_err(),
            CollectionError::NotFound {
                id: "99".to_string()
            }
        );
    }

    #[test]
    fn get_by_index_fetches_current_page() {
        let mut c = collection();
        let first = c.get_by_index(0).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(c.repository().calls(), vec![1]);

        assert_eq!(
            c.get_by_index(2).unwrap_err(),
            CollectionError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn index_operator_reads_loaded_page() {
        let mut c = collection();
        let objects = c.objects().unwrap();
        assert_eq!(c[0], *objects[0]);
        assert_eq!(c[1].name, "Channel 2");
        assert!(c.get_loaded(2).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_operator_panics_when_page_not_loaded() {
        let c = collection();
        let _ = &c[0];
    }

    #[test]
    fn set_current_page_rejects_zero() {
        let mut c = collection();
        assert_eq!(
            c.set_current_page(0).unwrap_err(),
            CollectionError::InvalidPage(0)
        );
        assert_eq!(c.current_page(), 1);
        c.set_current_page(7).unwrap();
        assert_eq!(c.current_page(), 7);
        assert!(c.repository().calls().is_empty());
    }

    #[test]
    fn clear_keeps_metadata_and_forgets_cache() {
        let mut c = collection();
        c.objects().unwrap();
        c.clear();

        assert!(c.is_initialized());
        assert!(!c.is_object_loaded(&1));
        assert!(!c.is_page_loaded(1));
        assert_eq!(c.loaded_len(), 0);
        assert_eq!(c.count(), 3);
        assert_eq!(c.metadata(), Some(meta(1)));

        c.set_current_page(2).unwrap();
        let objects = c.objects().unwrap();
        assert_eq!(ids(&objects), vec![3]);
        assert!(c.is_object_loaded(&3));
        assert!(c.is_page_loaded(2));
        assert!(!c.is_page_loaded(1));
    }

    #[test]
    fn clear_then_read_refetches() {
        let mut c = collection();
        c.objects().unwrap();
        c.clear();
        c.objects().unwrap();
        assert_eq!(c.repository().calls(), vec![1, 1]);
        assert!(c.is_object_loaded(&2));
    }

    #[test]
    fn to_vec_loads_everything_in_page_order() {
        let mut c = collection();
        let all = c.to_vec().unwrap();

        assert_eq!(ids(&all), vec![1, 2, 3]);
        assert_eq!(all.len() as u64, c.count());
        assert!(c.is_fully_loaded());
        assert_eq!(c.current_page(), 1);
    }

    #[test]
    fn to_vec_only_fetches_missing_pages() {
        let mut c = collection();
        c.set_current_page(2).unwrap();
        c.objects().unwrap();

        let all = c.to_vec().unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3]);
        assert_eq!(c.repository().calls(), vec![2, 1]);
        assert_eq!(c.current_page(), 2);
    }

    #[test]
    fn to_vec_returns_shared_objects_once() {
        let mut c = collection();
        // object 2 shifted onto page 2 between fetches
        c.repository().set_page(2, meta(2), &[2, 3]);
        let all = c.to_vec().unwrap();
        assert_eq!(ids(&all), vec![1, 2, 3]);
    }

    #[test]
    fn to_vec_failing_part_way_keeps_earlier_pages() {
        let repo = FakeRepository::default();
        let three_pages = |page| PageMeta {
            total: 5,
            page,
            pages: 3,
            limit: 2,
        };
        repo.set_page(1, three_pages(1), &[1, 2]);
        repo.set_page(2, three_pages(2), &[3, 4]);
        let mut c = ObjectCollection::new(repo);

        // page 3 is missing, so the repository answers NotFound
        let err = c.to_vec().unwrap_err();
        assert_eq!(err, CollectionError::Repository(ApiError::NotFound));
        assert!(c.is_page_loaded(1));
        assert!(c.is_page_loaded(2));
        assert!(!c.is_page_loaded(3));
        assert!(!c.is_fully_loaded());
        assert_eq!(c.count(), 5);
        assert_eq!(c.loaded_len(), 4);
        assert_eq!(c.current_page(), 1);
        assert_eq!(c.repository().calls(), vec![1, 2, 3]);

        c.repository().set_page(3, three_pages(3), &[5]);
        assert_eq!(ids(&c.to_vec().unwrap()), vec![1, 2, 3, 4, 5]);
        assert_eq!(c.repository().calls(), vec![1, 2, 3, 3]);
    }

    #[test]
    fn failed_fetch_leaves_state_untouched() {
        let mut c = collection();
        c.objects().unwrap();
        c.increase_page();
        c.repository()
            .fail_next(ApiError::Transport("connection reset".to_string()));

        let err = c.objects().unwrap_err();
        assert_eq!(
            err,
            CollectionError::Repository(ApiError::Transport("connection reset".to_string()))
        );
        assert!(!c.is_page_loaded(2));
        assert!(!c.is_fully_loaded());
        assert_eq!(c.count(), 3);
        assert_eq!(c.metadata(), Some(meta(1)));
        assert!(c.is_page_loaded(1));

        // retrying is safe
        assert_eq!(ids(&c.objects().unwrap()), vec![3]);
        assert!(c.is_fully_loaded());
    }

    #[test]
    fn failed_first_fetch_stays_uninitialized() {
        let mut c = collection();
        c.repository().fail_next(ApiError::NotFound);
        assert!(c.objects().is_err());
        assert!(!c.is_initialized());
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn error_status_page_is_rejected() {
        let mut c = collection();
        c.repository().pages.lock().unwrap().insert(
            1,
            PageResult {
                status: PageStatus::Error("denied".to_string()),
                meta: meta(1),
                objects: vec![channel(1)],
            },
        );
        let err = c.objects().unwrap_err();
        assert_eq!(
            err,
            CollectionError::Repository(ApiError::Status("denied".to_string()))
        );
        assert!(!c.is_initialized());
        assert!(!c.is_object_loaded(&1));
    }

    #[test]
    fn refetched_page_replaces_entry_and_keeps_dropped_ids_cached() {
        let mut c = collection();
        c.objects().unwrap();

        c.repository().set_page(1, meta(1), &[1, 4]);
        c.load_page(1).unwrap();

        assert_eq!(ids(&c.objects().unwrap()), vec![1, 4]);
        assert!(c.is_object_loaded(&2));
        assert!(c.is_object_loaded(&4));
        assert_eq!(c.repository().calls(), vec![1, 1]);
    }

    #[test]
    fn metadata_is_last_write_wins() {
        let mut c = collection();
        c.objects().unwrap();
        let grown = PageMeta {
            total: 5,
            page: 2,
            pages: 3,
            limit: 2,
        };
        c.repository().set_page(2, grown, &[3, 4]);
        c.increase_page();
        c.objects().unwrap();

        assert_eq!(c.count(), 5);
        assert!(!c.is_fully_loaded());
    }

    #[test]
    fn empty_resource_is_fully_loaded_after_first_fetch() {
        let repo = FakeRepository::default();
        let empty = PageMeta {
            total: 0,
            page: 1,
            pages: 0,
            limit: 2,
        };
        repo.set_page(1, empty, &[]);
        let mut c = ObjectCollection::new(repo);

        assert!(c.to_vec().unwrap().is_empty());
        assert!(c.is_initialized());
        assert!(c.is_fully_loaded());
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn shared_behind_a_mutex() {
        let c = Arc::new(Mutex::new(collection()));
        let handles: Vec<_> = (1..=2u32)
            .map(|page| {
                let c = Arc::clone(&c);
                std::thread::spawn(move || {
                    let mut c = c.lock().unwrap();
                    c.set_current_page(page).unwrap();
                    c.objects().unwrap().len()
                })
            })
            .collect();
        let mut lens: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        lens.sort_unstable();

        assert_eq!(lens, vec![1, 2]);
        assert!(c.lock().unwrap().is_fully_loaded());
    }
}
