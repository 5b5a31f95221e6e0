use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::executor::block_on;

use quill::hir::{PropertyInfo, StaticOracle, TypeOracle};
use quill::project::{MetadataCache, ProjectError, ProjectSettings, Workspace};
use quill::{CancellationToken, ProjectId};

use crate::helpers::fixtures::{PAGE, oracle, settings};

fn workspace_with(ids: &[&str]) -> (Workspace, Vec<Arc<StaticOracle>>) {
    let mut workspace = Workspace::new();
    let mut oracles = Vec::new();
    for id in ids {
        let oracle = Arc::new(oracle());
        workspace
            .add_project(ProjectId::new(*id), oracle.clone() as Arc<dyn TypeOracle>, settings())
            .unwrap();
        oracles.push(oracle);
    }
    (workspace, oracles)
}

#[test]
fn test_documents_belong_to_one_project() {
    let cancel = CancellationToken::new();
    let (mut workspace, _) = workspace_with(&["web", "admin"]);
    let admin_page = "file:///admin/src/main/resources/templates/page.html";
    workspace
        .project_mut(&ProjectId::new("web"))
        .unwrap()
        .open_document(PAGE, "{cdi:items}", &cancel)
        .unwrap();
    workspace
        .project_mut(&ProjectId::new("admin"))
        .unwrap()
        .open_document(admin_page, "{missing}", &cancel)
        .unwrap();

    assert_eq!(workspace.project_for_document(PAGE).unwrap().id(), &ProjectId::new("web"));
    assert_eq!(
        workspace.project_for_document(admin_page).unwrap().id(),
        &ProjectId::new("admin")
    );
    assert!(workspace.project_for_document("file:///elsewhere.html").is_none());
    assert_eq!(workspace.projects().count(), 2);
}

#[test]
fn test_remove_unknown_project() {
    let (mut workspace, _) = workspace_with(&["web"]);
    assert!(matches!(
        workspace.remove_project(&ProjectId::new("nope")),
        Err(ProjectError::UnknownProject(_))
    ));
    assert!(matches!(
        workspace.config_metadata(&ProjectId::new("nope")),
        Err(ProjectError::UnknownProject(_))
    ));
    assert_eq!(
        workspace.remove_project(&ProjectId::new("web")).unwrap().id(),
        &ProjectId::new("web")
    );
}

#[test]
fn test_metadata_refetched_only_for_the_changed_project() {
    let (workspace, oracles) = workspace_with(&["web", "admin"]);
    let web = ProjectId::new("web");
    let admin = ProjectId::new("admin");
    let web_before = workspace.config_metadata(&web).unwrap();
    let admin_before = workspace.config_metadata(&admin).unwrap();

    assert!(block_on(web_before.clone()).unwrap().lookup("quarkus.web.root").is_none());
    oracles[0].insert_property(PropertyInfo::new("quarkus.web.root", "java.lang.String"));
    workspace.on_type_info_changed(&web).unwrap();

    let web_after = workspace.config_metadata(&web).unwrap();
    assert!(!web_before.ptr_eq(&web_after));
    assert!(admin_before.ptr_eq(&workspace.config_metadata(&admin).unwrap()));
    let metadata = block_on(web_after).unwrap();
    assert!(metadata.lookup("quarkus.web.root").is_some());
}

#[test]
fn test_concurrent_requests_share_one_fetch() {
    let cache: MetadataCache<&'static str, usize> = MetadataCache::new();
    let fetches = Arc::new(AtomicUsize::new(0));
    let fetch = |fetches: Arc<AtomicUsize>| {
        move || async move { fetches.fetch_add(1, Ordering::SeqCst) + 1 }.boxed()
    };

    let a = cache.get_or_fetch("web", fetch(fetches.clone()));
    let b = cache.get_or_fetch("web", fetch(fetches.clone()));
    let (x, y) = block_on(futures::future::join(a, b));
    assert_eq!((x, y), (1, 1));
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    assert!(cache.invalidate(&"web"));
    assert!(!cache.contains(&"web"));
    assert_eq!(block_on(cache.get_or_fetch("web", fetch(fetches.clone()))), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_default_settings_project() {
    let mut workspace = Workspace::new();
    let project = workspace
        .add_project(ProjectId::new("bare"), Arc::new(StaticOracle::new()), ProjectSettings::default())
        .unwrap();
    assert_eq!(project.document_count(), 0);
}
