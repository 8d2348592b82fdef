mod test_chat;
mod test_session_end;
