//! Session & snapshot loading (spec §2, §9 design notes). The engine never
//! talks to the cluster API directly: a `SnapshotSource` is the trusted,
//! out-of-scope collaborator (pod-group construction, admission, binder)
//! that hands the session an immutable view of the world, grounded on the
//! teacher's `Cache` (`cache.rs`) — here generalized from a flat pod/node
//! map to the full §3 data model.

use std::collections::HashMap;

use common::Uid;

use crate::model::{validate_subgroups, Node, Pod, PodGroup, QueueTree};

/// The external collaborator seam named in spec §1 ("Out of scope:
/// pod-group construction ... admission validation ... binder"). A real
/// deployment implements this against the Kubernetes API server; tests
/// implement it as an in-memory fixture.
pub trait SnapshotSource {
    fn list_pod_groups(&self) -> anyhow::Result<Vec<PodGroup>>;
    fn list_pods(&self) -> anyhow::Result<Vec<Pod>>;
    fn list_nodes(&self) -> anyhow::Result<Vec<Node>>;
    fn list_queues(&self) -> anyhow::Result<Vec<crate::model::Queue>>;
}

/// All snapshot-derived entities live for exactly one session (spec §3
/// "Lifetimes"): built once, read (and overlaid via statements) throughout
/// the action pipeline, then dropped.
#[derive(Clone)]
pub struct Snapshot {
    pub pod_groups: HashMap<Uid, PodGroup>,
    pub pods: HashMap<Uid, Pod>,
    pub nodes: HashMap<String, Node>,
    pub queues: QueueTree,
}

impl Snapshot {
    pub fn load(source: &dyn SnapshotSource) -> anyhow::Result<Self> {
        let pod_groups = source
            .list_pod_groups()?
            .into_iter()
            .filter_map(|pg| match validate_subgroups(&pg.sub_groups) {
                Ok(()) => Some((pg.uid.clone(), pg)),
                Err(e) => {
                    log::warn!("pod group {} has an invalid sub-group DAG, skipping from ordering: {e}", pg.uid);
                    None
                }
            })
            .collect();
        let pods = source
            .list_pods()?
            .into_iter()
            .map(|p| (p.uid.clone(), p))
            .collect();
        let nodes = source
            .list_nodes()?
            .into_iter()
            .map(|n| (n.name.clone(), n))
            .collect();
        let queues = QueueTree::build(source.list_queues()?)
            .map_err(|e| anyhow::anyhow!("invalid queue tree: {e}"))?;
        Ok(Self {
            pod_groups,
            pods,
            nodes,
            queues,
        })
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    pub fn pod_group(&self, uid: &Uid) -> Option<&PodGroup> {
        self.pod_groups.get(uid)
    }

    pub fn pod_group_mut(&mut self, uid: &Uid) -> Option<&mut PodGroup> {
        self.pod_groups.get_mut(uid)
    }

    pub fn pod(&self, uid: &Uid) -> Option<&Pod> {
        self.pods.get(uid)
    }

    pub fn pod_mut(&mut self, uid: &Uid) -> Option<&mut Pod> {
        self.pods.get_mut(uid)
    }

    pub fn pods_of(&self, pod_group_uid: &Uid) -> impl Iterator<Item = &Pod> {
        self.pods
            .values()
            .filter(move |p| &p.pod_group_uid == pod_group_uid)
    }
}

/// In-memory fixture `SnapshotSource`, used pervasively by scenario tests
/// (spec §8 seed tests S1-S6), mirroring the teacher's test-fixture style
/// of building a `Cache` directly rather than going through a live cluster.
pub struct FixtureSource {
    pub pod_groups: Vec<PodGroup>,
    pub pods: Vec<Pod>,
    pub nodes: Vec<Node>,
    pub queues: Vec<crate::model::Queue>,
}

impl SnapshotSource for FixtureSource {
    fn list_pod_groups(&self) -> anyhow::Result<Vec<PodGroup>> {
        Ok(self.pod_groups.clone())
    }

    fn list_pods(&self) -> anyhow::Result<Vec<Pod>> {
        Ok(self.pods.clone())
    }

    fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        Ok(self.nodes.clone())
    }

    fn list_queues(&self) -> anyhow::Result<Vec<crate::model::Queue>> {
        Ok(self.queues.clone())
    }
}
