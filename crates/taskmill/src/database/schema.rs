/*
 *  Copyright 2025-2026 Taskmill Contributors
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Diesel table definitions shared by both backends.
//!
//! Column types are restricted to ones that map identically on PostgreSQL
//! and SQLite (BigInt surrogate keys, Text JSON payloads, Timestamp via
//! chrono::NaiveDateTime) so a single set of models serves both.

diesel::table! {
    task_types (id) {
        id -> BigInt,
        name -> Text,
        version -> Text,
        param_schema -> Text,
        is_active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    tasks (id) {
        id -> BigInt,
        task_type_id -> BigInt,
        status -> Text,
        params -> Text,
        dedupe_key -> Text,
        priority -> Integer,
        progress -> Integer,
        attempts -> Integer,
        max_attempts -> Integer,
        claimed_by -> Nullable<Text>,
        claimed_at -> Nullable<Timestamp>,
        result -> Nullable<Text>,
        error_message -> Nullable<Text>,
        completed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    task_history (id) {
        id -> BigInt,
        task_id -> BigInt,
        status_change -> Text,
        worker_id -> Nullable<Text>,
        message -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(tasks -> task_types (task_type_id));
diesel::joinable!(task_history -> tasks (task_id));

diesel::allow_tables_to_appear_in_same_query!(task_types, tasks, task_history);
