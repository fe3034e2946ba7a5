/// The host text field the keyboard is typing into.
///
/// Implementations forward to the platform input connection. Errors on the
/// host side are the host's to swallow; the session never sees them.
pub trait InputConnection {
    fn commit_text(&mut self, text: &str);

    /// Delete `before` code points preceding the cursor and `after` following it.
    fn delete_surrounding_code_points(&mut self, before: usize, after: usize);

    /// Delete `before` UTF-16 units preceding the cursor and `after` following it.
    fn delete_surrounding_text(&mut self, before: usize, after: usize);
}
