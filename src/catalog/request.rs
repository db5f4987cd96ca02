use super::{EntityDescriptor, EntityType, FieldDescriptor as F, FieldKind as K};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    entity: EntityType::Request,
    endpoint: "requests",
    id_param: "request_id",
    mandatory_field: "subject",
    sortable_fields: &[
        "created_time",
        "due_by_time",
        "first_response_due_by_time",
        "last_updated_time",
        "scheduled_start_time",
        "scheduled_end_time",
        "subject",
        "id",
        "priority",
        "status",
    ],
    fields: &[
        ("subject", F::plain(K::String)),
        ("description", F::plain(K::String)),
        ("impact_details", F::plain(K::String)),
        ("update_reason", F::plain(K::String)),
        ("status_change_comments", F::plain(K::String)),
        ("status", F::plain(K::Lookup)),
        ("template", F::plain(K::Lookup)),
        ("priority", F::plain(K::Lookup)),
        ("urgency", F::plain(K::Lookup)),
        ("impact", F::plain(K::Lookup)),
        ("mode", F::plain(K::Lookup)),
        ("level", F::plain(K::Lookup)),
        ("site", F::plain(K::Lookup)),
        ("group", F::plain(K::Lookup)),
        ("category", F::plain(K::Lookup)),
        ("subcategory", F::plain(K::Lookup)),
        ("item", F::plain(K::Lookup)),
        ("requester", F::plain(K::User)),
        ("technician", F::plain(K::User)),
        ("on_behalf_of", F::plain(K::User)),
        ("editor", F::plain(K::User)),
        ("due_by_time", F::plain(K::DateTime)),
        ("first_response_due_by_time", F::plain(K::DateTime)),
        ("scheduled_start_time", F::plain(K::DateTime)),
        ("scheduled_end_time", F::plain(K::DateTime)),
    ],
};
