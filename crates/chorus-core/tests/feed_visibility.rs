//! Feed assembly scenarios: scope filtering, ordering, membership changes,
//! and tombstone rendering.

use chorus_core::access;
use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::feed::{FeedQuery, FeedScope, ResolvedRef, assemble};
use chorus_core::model::{EntityRef, EntityType, InstanceFlavor, User};
use chorus_core::store::{self, entity};
use chorus_core::store::entity::NewWorkspace;
use rusqlite::Connection;

struct Fixture {
    conn: Connection,
    _dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tmpdir");
        let conn = store::open_store(&dir.path().join("chorus.sqlite3")).expect("open store");
        Self { conn, _dir: dir }
    }

    fn user(&self, name: &str, is_admin: bool) -> User {
        let id = entity::create_user(&self.conn, name, is_admin).expect("user");
        entity::get_user(&self.conn, id).expect("query").expect("user")
    }

    fn note_on_workspace(&mut self, actor: &User, workspace: i64, body: &str) -> i64 {
        emit(
            &mut self.conn,
            &EmitRequest::new(EventKind::NoteOnWorkspace, actor.id)
                .target(
                    TargetRole::Workspace,
                    EntityRef::new(EntityType::Workspace, workspace),
                )
                .field("body", body),
        )
        .expect("emit note")
        .id
    }
}

#[test]
fn workspace_feed_returns_only_its_events_newest_first() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let ws_a = entity::create_workspace(&fx.conn, &NewWorkspace::private("alpha", owner.id))
        .expect("ws");
    let ws_b = entity::create_workspace(&fx.conn, &NewWorkspace::private("beta", owner.id))
        .expect("ws");

    let a1 = fx.note_on_workspace(&owner, ws_a, "first in alpha");
    let _b1 = fx.note_on_workspace(&owner, ws_b, "only in beta");
    let a2 = fx.note_on_workspace(&owner, ws_a, "second in alpha");

    let page = assemble(
        &fx.conn,
        FeedScope::Workspace(ws_a),
        &owner,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");

    let ids: Vec<i64> = page.entries.iter().map(|e| e.event.id).collect();
    assert_eq!(ids, vec![a2, a1], "id descending, beta's event excluded");
    assert_eq!(page.total, 2);
}

#[test]
fn private_workspace_membership_grant_scenario() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let outsider = fx.user("outsider", false);
    let ws = entity::create_workspace(&fx.conn, &NewWorkspace::private("research", owner.id))
        .expect("ws");

    let note = fx.note_on_workspace(&owner, ws, "baseline numbers in");

    // Non-member, non-admin: empty result, not an error, and the filtered
    // event does not count toward the total.
    let before = assemble(
        &fx.conn,
        FeedScope::Workspace(ws),
        &outsider,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert!(before.scope_found);
    assert!(before.entries.is_empty());
    assert_eq!(before.total, 0);

    // Owner grants membership; the next query sees the earlier note.
    access::add_member(&fx.conn, &owner, ws, outsider.id).expect("add member");
    let after = assemble(
        &fx.conn,
        FeedScope::Workspace(ws),
        &outsider,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(after.total, 1);
    assert_eq!(after.entries[0].event.id, note);
    assert_eq!(after.entries[0].event.body(), Some("baseline numbers in"));
}

#[test]
fn admin_sees_private_workspace_feeds() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let admin = fx.user("admin", true);
    let ws = entity::create_workspace(&fx.conn, &NewWorkspace::private("research", owner.id))
        .expect("ws");
    fx.note_on_workspace(&owner, ws, "for members only");

    let page = assemble(
        &fx.conn,
        FeedScope::Workspace(ws),
        &admin,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(page.total, 1);
}

#[test]
fn global_feed_carries_instance_events_to_everyone() {
    let mut fx = Fixture::new();
    let dba = fx.user("dba", false);
    let analyst = fx.user("analyst", false);
    let inst = entity::create_instance(&fx.conn, "prod-gp", InstanceFlavor::Greenplum, None)
        .expect("instance");

    emit(
        &mut fx.conn,
        &EmitRequest::new(EventKind::GreenplumInstanceCreated, dba.id).target(
            TargetRole::Target1,
            EntityRef::new(EntityType::Instance, inst),
        ),
    )
    .expect("emit");
    emit(
        &mut fx.conn,
        &EmitRequest::new(EventKind::NoteOnGreenplumInstance, dba.id)
            .target(
                TargetRole::Target1,
                EntityRef::new(EntityType::Instance, inst),
            )
            .field("body", "maintenance window friday"),
    )
    .expect("emit");

    let page = assemble(
        &fx.conn,
        FeedScope::Global,
        &analyst,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(page.total, 2);

    // The instance's own feed shows the same events.
    let inst_page = assemble(
        &fx.conn,
        FeedScope::Instance(inst),
        &analyst,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(inst_page.total, 2);
}

#[test]
fn actor_feed_collects_their_events_across_scopes() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let ws = entity::create_workspace(&fx.conn, &NewWorkspace::private("alpha", owner.id))
        .expect("ws");
    let inst = entity::create_instance(&fx.conn, "lake", InstanceFlavor::Hadoop, None)
        .expect("instance");

    fx.note_on_workspace(&owner, ws, "workspace note");
    emit(
        &mut fx.conn,
        &EmitRequest::new(EventKind::NoteOnHadoopInstance, owner.id)
            .target(
                TargetRole::Target1,
                EntityRef::new(EntityType::Instance, inst),
            )
            .field("body", "instance note"),
    )
    .expect("emit");

    let page = assemble(
        &fx.conn,
        FeedScope::Actor(owner.id),
        &owner,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(page.total, 2);
}

#[test]
fn deleted_dataset_tombstones_without_breaking_the_page() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let ws = entity::create_workspace(&fx.conn, &NewWorkspace::private("alpha", owner.id))
        .expect("ws");
    let ds = entity::create_dataset(&fx.conn, ws, "orders").expect("dataset");

    emit(
        &mut fx.conn,
        &EmitRequest::new(EventKind::NoteOnDataset, owner.id)
            .target(TargetRole::Target1, EntityRef::new(EntityType::Dataset, ds))
            .target(
                TargetRole::Workspace,
                EntityRef::new(EntityType::Workspace, ws),
            )
            .field("body", "needs a partition key"),
    )
    .expect("emit");
    let survivor = fx.note_on_workspace(&owner, ws, "unrelated note");

    entity::delete_dataset(&fx.conn, ds).expect("delete dataset");

    let page = assemble(
        &fx.conn,
        FeedScope::Workspace(ws),
        &owner,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    assert_eq!(page.total, 2, "the rest of the page is unaffected");

    let dataset_entry = page
        .entries
        .iter()
        .find(|e| e.event.kind == EventKind::NoteOnDataset)
        .expect("dataset note present");
    assert!(dataset_entry.targets.iter().any(|t| matches!(
        t,
        ResolvedRef::Tombstone {
            entity_type: EntityType::Dataset,
            ..
        }
    )));

    assert!(page.entries.iter().any(|e| e.event.id == survivor));
}

#[test]
fn comments_ride_along_in_insertion_order() {
    let mut fx = Fixture::new();
    let owner = fx.user("owner", false);
    let peer = fx.user("peer", false);
    let ws = entity::create_workspace(&fx.conn, &NewWorkspace::private("alpha", owner.id))
        .expect("ws");
    access::add_member(&fx.conn, &owner, ws, peer.id).expect("add member");

    let note = fx.note_on_workspace(&owner, ws, "please review");
    store::query::add_comment(&fx.conn, note, peer.id, "on it").expect("comment");
    store::query::add_comment(&fx.conn, note, owner.id, "thanks").expect("comment");

    let page = assemble(
        &fx.conn,
        FeedScope::Workspace(ws),
        &peer,
        &FeedQuery::page(0, 10),
    )
    .expect("assemble");
    let comments = &page.entries[0].comments;
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].author, "peer");
    assert_eq!(comments[1].author, "owner");
}
