use super::{EntityDescriptor, EntityType, FieldDescriptor as F, FieldKind as K};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    entity: EntityType::Problem,
    endpoint: "problems",
    id_param: "problem_id",
    mandatory_field: "title",
    sortable_fields: &[
        "reported_time",
        "due_by_time",
        "closed_time",
        "created_time",
        "id",
        "title",
        "priority",
        "status",
    ],
    fields: &[
        ("title", F::plain(K::String)),
        ("description", F::plain(K::String)),
        ("impact_details", F::plain(K::String)),
        ("reported_time", F::plain(K::DateTime)),
        ("due_by_time", F::plain(K::DateTime)),
        ("closed_time", F::plain(K::DateTime)),
        ("reported_by", F::plain(K::User)),
        ("technician", F::plain(K::User)),
        ("requester", F::plain(K::User)),
        ("category", F::plain(K::Lookup)),
        ("impact", F::plain(K::Lookup)),
        ("priority", F::plain(K::Lookup)),
        ("subcategory", F::plain(K::Lookup)),
        ("item", F::plain(K::Lookup)),
        ("urgency", F::plain(K::Lookup)),
        ("site", F::plain(K::Lookup)),
        ("group", F::plain(K::Lookup)),
        ("status", F::plain(K::Lookup)),
        ("template", F::plain(K::Lookup)),
        // Grouped into sub-objects on the wire
        ("impact_details_description", F::grouped(K::String, "impact_details")),
        ("root_cause_description", F::grouped(K::String, "root_cause")),
        ("symptoms_description", F::grouped(K::String, "symptoms")),
        ("known_error_comments", F::grouped(K::String, "known_error_details")),
        ("is_known_error", F::grouped(K::Boolean, "known_error_details")),
        ("close_details_comments", F::grouped(K::String, "close_details")),
        ("closure_code", F::grouped(K::Lookup, "close_details")),
        ("resolution_details_description", F::grouped(K::String, "resolution_details")),
        ("workaround_details_description", F::grouped(K::String, "workaround_details")),
    ],
};
