// Esquema Diesel de las tablas de importación.
// Tablas: task_jobs, task_items, resource_flow_locks
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    task_jobs (id) {
        id -> Text,
        bk_biz_id -> BigInt,
        source -> Text,
        vendor -> Text,
        account_id -> Text,
        resource -> Text,
        operations -> Text,
        state -> Text,
        flow_ids -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    task_items (id) {
        id -> Text,
        job_id -> Text,
        seq -> BigInt,
        operation -> Text,
        state -> Text,
        param -> Text,
        flow_id -> Nullable<Text>,
        action_ids -> Text,
        created_at_ts -> BigInt,
    }
}
diesel::table! {
    resource_flow_locks (res_type, res_id) {
        res_type -> Text,
        res_id -> Text,
        owner_flow_id -> Text,
        task_type -> Text,
        created_at_ts -> BigInt,
    }
}
allow_tables_to_appear_in_same_query!(task_jobs, task_items, resource_flow_locks);
