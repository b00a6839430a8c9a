mod invalid_json;
mod meeting_delete;
