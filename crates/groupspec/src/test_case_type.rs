/// How a test or group is marked: plain, focused (`fit`/`fdescribe`) or
/// ignored (`xit`/`xdescribe`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TestCaseType {
    #[default]
    Normal,
    Focused,
    Ignored,
}

impl TestCaseType {
    /// The effective type of an item marked `own` nested inside a group of
    /// type `self`.
    ///
    /// An ignored group forces everything below it to be ignored. Otherwise an
    /// explicit marking on the item wins, and an unmarked item inherits the
    /// group's type.
    pub fn descendant_test_type(self, own: TestCaseType) -> TestCaseType {
        match (self, own) {
            (TestCaseType::Ignored, _) => TestCaseType::Ignored,
            (ancestor, TestCaseType::Normal) => ancestor,
            (_, explicit) => explicit,
        }
    }

    pub fn is_focused(self) -> bool {
        self == TestCaseType::Focused
    }

    pub fn is_ignored(self) -> bool {
        self == TestCaseType::Ignored
    }
}
