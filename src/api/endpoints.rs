//! Endpoint registry for the freight backend
//!
//! One definition per backend operation: request builder plus tag
//! layout. List queries provide their kind-level tag and one tag per
//! returned row, so a write can invalidate a single detail view or a
//! whole family of listings with the same declaration.

use crate::client::http::{query_pairs, ApiRequest};
use crate::client::registry::{MutationDef, QueryDef};
use crate::client::store::tags::{Tag, TagKind};

use super::types::{
    Consolidation, CsvFile, ImportProgress, ImportReceipt, Metrics, Page, PageRequest, Shipment,
    ShipmentFilter,
};

/// `POST /imports/` with the CSV as multipart field `file`.
pub fn upload_csv() -> MutationDef<CsvFile, ImportReceipt> {
    MutationDef::new("upload_csv", build_upload, upload_invalidates)
}

fn build_upload(file: &CsvFile) -> ApiRequest {
    ApiRequest::post("imports/").with_multipart("file", file.file_name.clone(), file.bytes.clone())
}

fn upload_invalidates(_file: &CsvFile) -> Vec<Tag> {
    vec![Tag::kind(TagKind::Imports)]
}

/// `GET /imports/{id}/progress/`.
pub fn import_progress() -> QueryDef<u64, ImportProgress> {
    QueryDef::new("import_progress", build_progress, progress_tags)
}

fn build_progress(id: &u64) -> ApiRequest {
    ApiRequest::get(format!("imports/{}/progress/", id))
}

fn progress_tags(id: &u64, _result: Option<&ImportProgress>) -> Vec<Tag> {
    vec![Tag::entity(TagKind::Imports, id.to_string())]
}

/// `GET /metrics/`.
pub fn metrics() -> QueryDef<(), Metrics> {
    QueryDef::new("metrics", build_metrics, metrics_tags)
}

fn build_metrics(_args: &()) -> ApiRequest {
    ApiRequest::get("metrics/")
}

fn metrics_tags(_args: &(), _result: Option<&Metrics>) -> Vec<Tag> {
    vec![Tag::kind(TagKind::Metrics)]
}

/// `GET /shipments/` with filter and pagination parameters.
pub fn shipments() -> QueryDef<ShipmentFilter, Page<Shipment>> {
    QueryDef::new("shipments", build_shipments, shipments_tags)
}

fn build_shipments(filter: &ShipmentFilter) -> ApiRequest {
    ApiRequest::get("shipments/").with_query(query_pairs(filter))
}

fn shipments_tags(_filter: &ShipmentFilter, result: Option<&Page<Shipment>>) -> Vec<Tag> {
    let mut tags = vec![Tag::kind(TagKind::Shipments)];
    if let Some(page) = result {
        tags.extend(
            page.results
                .iter()
                .map(|shipment| Tag::entity(TagKind::Shipments, shipment.shipment_id.clone())),
        );
    }
    tags
}

/// `GET /shipments/{id}/`.
pub fn shipment_detail() -> QueryDef<String, Shipment> {
    QueryDef::new("shipment_detail", build_shipment_detail, shipment_detail_tags)
}

fn build_shipment_detail(id: &String) -> ApiRequest {
    ApiRequest::get(format!("shipments/{}/", urlencoding::encode(id)))
}

fn shipment_detail_tags(id: &String, _result: Option<&Shipment>) -> Vec<Tag> {
    vec![Tag::entity(TagKind::Shipments, id.clone())]
}

/// `GET /consolidations/` with pagination parameters.
pub fn consolidations() -> QueryDef<PageRequest, Page<Consolidation>> {
    QueryDef::new("consolidations", build_consolidations, consolidations_tags)
}

fn build_consolidations(request: &PageRequest) -> ApiRequest {
    ApiRequest::get("consolidations/").with_query(query_pairs(request))
}

fn consolidations_tags(
    _request: &PageRequest,
    result: Option<&Page<Consolidation>>,
) -> Vec<Tag> {
    let mut tags = vec![Tag::kind(TagKind::Consolidations)];
    if let Some(page) = result {
        tags.extend(
            page.results
                .iter()
                .map(|con| Tag::entity(TagKind::Consolidations, con.id.to_string())),
        );
    }
    tags
}

/// `GET /consolidations/{id}/`.
pub fn consolidation_detail() -> QueryDef<u64, Consolidation> {
    QueryDef::new(
        "consolidation_detail",
        build_consolidation_detail,
        consolidation_detail_tags,
    )
}

fn build_consolidation_detail(id: &u64) -> ApiRequest {
    ApiRequest::get(format!("consolidations/{}/", id))
}

fn consolidation_detail_tags(id: &u64, _result: Option<&Consolidation>) -> Vec<Tag> {
    vec![Tag::entity(TagKind::Consolidations, id.to_string())]
}
