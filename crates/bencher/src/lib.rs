/// A named response fixture measured by the benchmarks.
#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn large(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Large, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }
}

/// A raw HTTP/1.1 response stored with `\n` line endings.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    /// The response as it goes over the wire, every line ending in CRLF.
    pub fn wire_bytes(&self) -> Vec<u8> {
        self.content.replace('\n', "\r\n").into_bytes()
    }

    /// Number of header lines, status line excluded.
    pub fn header_count(&self) -> usize {
        self.content.lines().skip(1).take_while(|line| !line.is_empty()).count()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}
