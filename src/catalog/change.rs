use super::{EntityDescriptor, EntityType, FieldDescriptor as F, FieldKind as K};

pub(super) static DESCRIPTOR: EntityDescriptor = EntityDescriptor {
    entity: EntityType::Change,
    endpoint: "changes",
    id_param: "change_id",
    mandatory_field: "title",
    sortable_fields: &[
        "created_time",
        "completed_time",
        "scheduled_start_time",
        "scheduled_end_time",
        "id",
        "title",
        "priority",
        "status",
        "stage",
    ],
    fields: &[
        ("title", F::plain(K::String)),
        ("description", F::plain(K::String)),
        ("comment", F::plain(K::String)),
        ("retrospective", F::plain(K::Boolean)),
        ("created_time", F::plain(K::DateTime)),
        ("completed_time", F::plain(K::DateTime)),
        ("scheduled_start_time", F::plain(K::DateTime)),
        ("scheduled_end_time", F::plain(K::DateTime)),
        ("stage", F::plain(K::Lookup)),
        ("status", F::plain(K::Lookup)),
        ("template", F::plain(K::Lookup)),
        ("change_requester", F::plain(K::User)),
        ("change_manager", F::plain(K::User)),
        ("change_owner", F::plain(K::User)),
        ("reason_for_change", F::plain(K::Lookup)),
        ("risk", F::plain(K::Lookup)),
        ("impact", F::plain(K::Lookup)),
        ("priority", F::plain(K::Lookup)),
        ("category", F::plain(K::Lookup)),
        ("subcategory", F::plain(K::Lookup)),
        ("item", F::plain(K::Lookup)),
        ("urgency", F::plain(K::Lookup)),
        ("change_type", F::plain(K::Lookup)),
        ("site", F::plain(K::Lookup)),
        ("group", F::plain(K::Lookup)),
        ("workflow", F::plain(K::Lookup)),
        ("roll_out_plan_description", F::grouped(K::String, "roll_out_plan")),
        ("back_out_plan_description", F::grouped(K::String, "back_out_plan")),
    ],
};
