//! End-to-end tests: fragments on disk through merge, model building,
//! metadata extraction and script rendering.

use std::{fs, path::Path};

use schemagen_core::{
  Dialect, SchemaBuilder, ScriptAction,
  dedup::{self, DEFAULT_KEY_HINT},
  metadata,
};

use crate::{HbmBuilder, Merger};

fn put(root: &Path, rel: &str, body: &str) {
  let path = root.join(rel);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, body).unwrap();
}

fn mapping(body: &str) -> String {
  format!("<hibernate-mapping package=\"org.example\">{body}</hibernate-mapping>")
}

// ─── Merge and build ─────────────────────────────────────────────────────────

#[test]
fn table_x_across_topics() {
  let tmp = tempfile::tempdir().unwrap();
  let (root, merged) = (tmp.path().join("hbm"), tmp.path().join("merged"));
  put(&root, "core/table_x.hbm.xml", &mapping(
    r#"<class name="X" table="table_x"><id name="id" type="long" column="id"/></class>"#,
  ));
  put(&root, "dataset/table_x.hbm.xml", &mapping(
    r#"<class name="X" table="table_x"><property name="value" type="string" column="value"/></class>"#,
  ));

  let report = Merger::default()
    .merge_topics(&root, &["core", "dataset"], &merged)
    .into_result()
    .unwrap();
  assert_eq!(report.written.len(), 1);
  let files: Vec<_> = fs::read_dir(&merged).unwrap().collect();
  assert_eq!(files.len(), 1);

  let model = HbmBuilder
    .build_model(&merged, Dialect::Postgis, None)
    .unwrap();
  let tables = metadata::extract(&model).unwrap();
  let table_x = &tables["table_x"];
  let columns: Vec<_> = table_x.columns.iter().map(|c| c.name.as_str()).collect();
  assert_eq!(columns, ["id", "value"]);
  assert_eq!(table_x.columns[0].sql_type.as_deref(), Some("int8"));
  assert_eq!(table_x.columns[0].not_null.as_deref(), Some("true"));
}

#[test]
fn collection_table_without_entity_reaches_metadata() {
  let tmp = tempfile::tempdir().unwrap();
  let (root, merged) = (tmp.path().join("hbm"), tmp.path().join("merged"));
  put(&root, "core/ref.hbm.xml", &mapping(
    r#"<class name="Ref" table="ref_tbl">
         <id name="id" column="ref_id"/>
         <set name="links" table="link_tbl">
           <key column="ref_id"/>
           <element column="target" type="string"/>
         </set>
       </class>"#,
  ));

  Merger::default()
    .merge_topics(&root, &["core"], &merged)
    .into_result()
    .unwrap();
  let model = HbmBuilder.build_model(&merged, Dialect::Geodb, None).unwrap();
  let tables = metadata::extract(&model).unwrap();

  assert!(model.entities.iter().all(|e| e.table != "link_tbl"));
  let link = &tables["link_tbl"];
  assert!(link.column("ref_id").is_some());
  assert_eq!(
    link.column("ref_id").unwrap().sql_type.as_deref(),
    Some("bigint")
  );
}

// ─── Scripts ─────────────────────────────────────────────────────────────────

const OBSERVATION: &str = r#"
  <class name="Offering" table="offering"><id name="id" column="offering_id"/></class>
  <class name="Observation" table="observation">
    <id name="id" column="observation_id"/>
    <set name="offerings" table="observation_offering">
      <key column="fk_observation_id" foreign-key="observationOfferingFk"/>
      <many-to-many class="Offering" column="fk_offering_id" foreign-key="observationHasOffering"/>
    </set>
    <subclass name="ObservationInfo">
      <set name="offerings" table="observation_offering">
        <key column="fk_observation_id" foreign-key="observationOfferingFk"/>
        <many-to-many class="Offering" column="fk_offering_id" foreign-key="observationHasOffering"/>
      </set>
    </subclass>
  </class>"#;

#[test]
fn duplicate_constraint_is_emitted_then_deduplicated() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("observation.hbm.xml"), mapping(OBSERVATION)).unwrap();

  let model = HbmBuilder.build_model(dir.path(), Dialect::Postgis, Some("public")).unwrap();
  let script = HbmBuilder.emit_script(&model, ScriptAction::Create).unwrap();

  let signature = dedup::constraint_name(DEFAULT_KEY_HINT);
  assert_eq!(script.iter().filter(|l| l.contains(&signature)).count(), 2);

  let cleaned = dedup::dedupe(&script, DEFAULT_KEY_HINT);
  assert_eq!(cleaned.iter().filter(|l| l.contains(&signature)).count(), 1);
  assert_eq!(cleaned.len(), script.len() - 1);
  // The other repeated constraint is not the deduplicator's business.
  let other = dedup::constraint_name("observationOfferingFk");
  assert_eq!(cleaned.iter().filter(|l| l.contains(&other)).count(), 2);
}

#[test]
fn drop_script_reverses_creation() {
  let dir = tempfile::tempdir().unwrap();
  fs::write(dir.path().join("observation.hbm.xml"), mapping(OBSERVATION)).unwrap();

  let model = HbmBuilder.build_model(dir.path(), Dialect::Postgis, None).unwrap();
  let script = HbmBuilder.emit_script(&model, ScriptAction::Drop).unwrap();
  let tables: Vec<_> = script
    .iter()
    .filter_map(|l| l.strip_prefix("drop table if exists "))
    .collect();
  assert_eq!(tables, [
    "observation_offering cascade",
    "observation cascade",
    "offering cascade",
  ]);
  assert!(script[0].starts_with("alter table if exists observation_offering drop constraint FK"));
}
