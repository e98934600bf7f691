//! Geometry helpers built on top of plain calls.

use super::Proxy;
use crate::args;
use crate::category::GeometryType;
use crate::error::{BridgeError, Result};
use tracing::debug;

impl Proxy {
    /// Geometry kind of this object.
    ///
    /// Kinds are checked in [`GeometryType::ALL`] order and the first match
    /// wins.
    pub fn geometry_type(&self) -> Result<GeometryType> {
        for geometry in GeometryType::ALL {
            if self.is_instance(geometry.isinstance_name())? {
                return Ok(geometry);
            }
        }
        Err(BridgeError::Classification {
            object: self.to_string(),
        })
    }

    /// Ids of all nodes on this geometry.
    ///
    /// The toolkit has no direct query for this, so the geometry is put into
    /// a temporary node set that is read back and deleted again.
    pub fn node_ids(&self) -> Result<Vec<i64>> {
        let geometry = self.geometry_type()?;
        let entity_id = self.invoke("id", &[])?.expect_i64()?;
        let cubit = self.root();

        let taken = cubit.invoke("get_nodeset_id_list", &[])?.into_i64_list()?;
        let temp_node_set_id = taken.into_iter().max().unwrap_or(0).max(0) + 1;
        debug!(
            "Collecting nodes of {} {} via temporary node set {}",
            geometry, entity_id, temp_node_set_id
        );

        cubit.invoke(
            "cmd",
            &args![format!(
                "nodeset {} {} {}",
                temp_node_set_id,
                geometry.cubit_str(),
                entity_id
            )],
        )?;
        let node_ids = cubit
            .invoke("get_nodeset_nodes_inclusive", &args![temp_node_set_id])?
            .into_i64_list();
        cubit.invoke("cmd", &args![format!("delete nodeset {}", temp_node_set_id)])?;
        node_ids
    }
}
