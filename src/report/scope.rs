//! Scope and lifecycle tracker.
//!
//! Rebuilds the nesting of class and method scopes from the flat record stream and routes plain text to the buffer
//! of the innermost open scope. The current position is one explicit [`Cursor`] value:
//!
//! - `Idle`: no class open. Before the first class, text belongs to the run-wide deployment buffer (owned by the
//!   parser); between classes it is carried into the next class scope.
//! - `IgnoredClass`: the agent reported a class outside the selection; its records and text are dropped.
//! - `Class`: a resolved class, with at most one open method scope.
//!
//! Where the lifecycle (instantiate/setup, cleanup/dispose) is tracked depends on the group, not on the stream:
//! [`ClassBody::Shared`] carries one class-level [`Lifecycle`], [`ClassBody::PerTest`] carries one per open method
//! scope. Lifecycle records arriving at the other level have nowhere to go and are dropped.
//!
//! ## Notes
//!
//! - Closing a scope yields [`Finished`] entries; the parser turns them into results.
//! - Shared groups only yield entries when the class scope closes, so a class-level cleanup failure still reaches
//!   every case of the class.
//! - Only a `Start` record opens a method scope. Any other record for a method that is not open is dropped, so a
//!   late or repeated record can never replace a case that already finished.
//! - Class-level text of a per-method group goes to the next method scope's Setup section; whatever is left when
//!   the class closes goes to the cases that never started.

use std::collections::BTreeMap;
use std::sync::Arc;

use nanotest_core::{ProtocolRecord, RecordScope, ReportCode, TestCaseGroup, TestCaseSelection};

use super::outcome::{self, Finished, Section, Verdict};

/// Last lifecycle step observed in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubPhase {
    #[default]
    None,
    Instantiated,
    SetupRunning,
    CleanupRunning,
    Disposed,
}

/// Which half of a scope text currently belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Instantiate / setup.
    Opening,
    /// The test body, or between tests at class level.
    Body,
    /// Cleanup / dispose.
    Closing,
}

/// Where a plain-text line went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRoute {
    /// No class scope has been opened yet; the caller owns the deployment buffer.
    Deployment,
    /// Kept by the tracker.
    Captured,
    Discarded,
}

/// Opening and closing halves of one scope.
///
/// `phase` is the last lifecycle step the agent announced; it only picks the wording of a failure line. `stage` is
/// the half that plain text belongs to right now. After a setup failure `stage` is `Closing` (whatever follows is
/// cleanup output) while `phase` still names the step that failed.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub phase: SubPhase,
    pub stage: Stage,
    pub setup: Section,
    pub cleanup: Section,
}

impl Lifecycle {
    fn new(stage: Stage) -> Self {
        Self {
            phase: SubPhase::None,
            stage,
            setup: Section::default(),
            cleanup: Section::default(),
        }
    }

    /// Apply an instantiate/setup/cleanup/dispose record. Returns `false` for any other code.
    fn apply(&mut self, record: &ProtocolRecord) -> bool {
        match record.code {
            ReportCode::Instantiate => {
                self.phase = SubPhase::Instantiated;
                self.stage = Stage::Opening;
            }
            ReportCode::Setup => {
                self.phase = SubPhase::SetupRunning;
                self.stage = Stage::Opening;
            }
            ReportCode::SetupComplete => self.stage = Stage::Body,
            ReportCode::SetupFail => {
                let line = outcome::setup_failure_line(self.phase, record.elapsed, record.reason_text());
                self.setup.record_failure(&line);
                self.stage = Stage::Closing;
            }
            ReportCode::Cleanup => {
                self.phase = SubPhase::CleanupRunning;
                self.stage = Stage::Closing;
            }
            ReportCode::Dispose => {
                self.phase = SubPhase::Disposed;
                self.stage = Stage::Closing;
            }
            ReportCode::CleanupFail => {
                let line = outcome::cleanup_failure_line(self.phase, record.elapsed, record.reason_text());
                self.cleanup.record_failure(&line);
                self.stage = Stage::Closing;
            }
            ReportCode::CleanUpComplete => self.stage = Stage::Closing,
            _ => return false,
        }
        true
    }

    /// A lifecycle method could not be invoked; the agent's reason goes into the opening or closing section.
    fn method_error(&mut self, reason: &str, in_opening: bool) {
        if in_opening {
            self.setup.record_failure(reason);
        } else {
            self.cleanup.record_failure(reason);
        }
        self.stage = Stage::Closing;
    }
}

/// Identity of a method or data-row scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodKey {
    pub identifier: String,
    pub data_row_index: i32,
}

impl MethodKey {
    fn of(record: &ProtocolRecord) -> Self {
        Self {
            identifier: record.identifier.clone(),
            data_row_index: record.data_row_index,
        }
    }
}

/// An open method or data-row scope that resolved to selected cases.
#[derive(Debug, Clone)]
pub struct MethodScope {
    pub key: MethodKey,
    pub positions: Vec<usize>,
    pub elapsed: u64,
    pub output: String,
    pub verdict: Option<Verdict>,
}

impl MethodScope {
    fn new(key: MethodKey, positions: Vec<usize>) -> Self {
        Self {
            key,
            positions,
            elapsed: 0,
            output: String::new(),
            verdict: None,
        }
    }

    /// Record a test-body code. Returns `true` when the code is a test verdict.
    fn apply_verdict(&mut self, record: &ProtocolRecord) -> bool {
        let verdict = match record.code {
            ReportCode::Pass => Verdict::passed(record.elapsed),
            ReportCode::Fail => Verdict::failed(record.elapsed, record.reason_text()),
            ReportCode::Skipped => Verdict::skipped(record.elapsed, record.reason_text()),
            ReportCode::MethodError => Verdict::method_not_found(record.elapsed, record.reason_text()),
            _ => return false,
        };
        self.verdict = Some(verdict);
        true
    }
}

/// A method scope of a per-method group, with its own lifecycle.
#[derive(Debug, Clone)]
pub struct PerTestScope {
    pub scope: MethodScope,
    pub lifecycle: Lifecycle,
}

/// A method scope slot: tracked, or ignored because the identifier resolved to no selected case.
#[derive(Debug, Clone)]
pub enum OpenMethod<T> {
    Tracked(T),
    Ignored(MethodKey),
}

trait Keyed {
    fn key(&self) -> &MethodKey;
}

impl Keyed for MethodScope {
    fn key(&self) -> &MethodKey {
        &self.key
    }
}

impl Keyed for PerTestScope {
    fn key(&self) -> &MethodKey {
        &self.scope.key
    }
}

impl<T: Keyed> OpenMethod<T> {
    fn key(&self) -> &MethodKey {
        match self {
            OpenMethod::Tracked(scope) => scope.key(),
            OpenMethod::Ignored(key) => key,
        }
    }
}

/// Whether `record` continues the scope in `slot`; otherwise a new scope has to be opened for it.
fn continues<T: Keyed>(slot: &Option<OpenMethod<T>>, record: &ProtocolRecord) -> bool {
    record.code != ReportCode::Start
        && slot.as_ref().is_some_and(|open| {
            let key = open.key();
            key.identifier == record.identifier && key.data_row_index == record.data_row_index
        })
}

/// A closed method scope of a shared group, kept until the class closes.
#[derive(Debug, Clone, Default)]
pub struct CaseDraft {
    pub elapsed: u64,
    pub verdict: Option<Verdict>,
    pub output: String,
}

/// Group-dependent part of an open class scope.
#[derive(Debug, Clone)]
pub enum ClassBody {
    /// Setup/cleanup run once for the class; results wait for the class scope to close.
    Shared {
        lifecycle: Lifecycle,
        drafts: BTreeMap<usize, CaseDraft>,
        method: Option<OpenMethod<MethodScope>>,
    },
    /// Setup/cleanup run inside every method scope; results are ready when the method scope closes.
    PerTest {
        /// Class-level text not yet handed to a method scope.
        class_text: String,
        method: Option<OpenMethod<PerTestScope>>,
    },
}

/// An open, resolved class scope.
#[derive(Debug, Clone)]
pub struct ClassScope {
    pub group: Arc<TestCaseGroup>,
    /// At least one method scope of this class started.
    pub any_test_started: bool,
    pub body: ClassBody,
}

/// Current position in the record stream.
#[derive(Debug, Clone, Default)]
pub enum Cursor {
    #[default]
    Idle,
    IgnoredClass {
        identifier: String,
    },
    Class(ClassScope),
}

/// Tracks open scopes and gathers finished cases.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    cursor: Cursor,
    /// A resolved class scope has been opened during this run.
    opened_class: bool,
    /// Text seen between class scopes, waiting for the next one.
    carried: String,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Apply one record. Returns the cases whose results are now fully resolved.
    pub fn apply(&mut self, record: &ProtocolRecord, selection: &TestCaseSelection) -> Vec<Finished> {
        tracing::debug!(
            scope = ?record.scope,
            identifier = %record.identifier,
            row = record.data_row_index,
            elapsed = record.elapsed,
            code = %record.code,
            "record"
        );
        match record.scope {
            RecordScope::Class => self.apply_class(record, selection),
            RecordScope::Method | RecordScope::DataRow => self.apply_method(record, selection),
        }
    }

    /// Route one plain-text line to the innermost open scope.
    pub fn route_text(&mut self, line: &str) -> TextRoute {
        let class = match &mut self.cursor {
            Cursor::Idle if self.opened_class => {
                push_line(&mut self.carried, line);
                return TextRoute::Captured;
            }
            Cursor::Idle => return TextRoute::Deployment,
            Cursor::IgnoredClass { .. } => return TextRoute::Discarded,
            Cursor::Class(class) => class,
        };
        let any_test_started = class.any_test_started;
        match &mut class.body {
            ClassBody::Shared {
                method: Some(OpenMethod::Tracked(scope)),
                ..
            } => push_line(&mut scope.output, line),
            ClassBody::Shared {
                method: Some(OpenMethod::Ignored(_)),
                ..
            } => return TextRoute::Discarded,
            ClassBody::Shared {
                lifecycle, method: None, ..
            } => {
                if in_opening_half(lifecycle.stage, any_test_started) {
                    lifecycle.setup.push_line(line);
                } else {
                    lifecycle.cleanup.push_line(line);
                }
            }
            ClassBody::PerTest {
                method: Some(OpenMethod::Tracked(open)),
                ..
            } => match open.lifecycle.stage {
                Stage::Opening => open.lifecycle.setup.push_line(line),
                Stage::Body => push_line(&mut open.scope.output, line),
                Stage::Closing => open.lifecycle.cleanup.push_line(line),
            },
            ClassBody::PerTest {
                method: Some(OpenMethod::Ignored(_)),
                ..
            } => return TextRoute::Discarded,
            ClassBody::PerTest {
                class_text, method: None,
            } => push_line(class_text, line),
        }
        TextRoute::Captured
    }

    /// Close every open scope, as at the end of the stream.
    pub fn close_all(&mut self, selection: &TestCaseSelection) -> Vec<Finished> {
        self.close_class(selection)
    }

    /// Take the text printed after the last class scope closed.
    pub fn take_carried(&mut self) -> String {
        std::mem::take(&mut self.carried)
    }

    fn apply_class(&mut self, record: &ProtocolRecord, selection: &TestCaseSelection) -> Vec<Finished> {
        if record.code == ReportCode::Start {
            let finished = self.close_class(selection);
            self.open_class(record, selection);
            return finished;
        }
        if record.code == ReportCode::Done && self.is_open_class(&record.identifier) {
            return self.close_class(selection);
        }

        match &mut self.cursor {
            Cursor::Idle => {
                tracing::debug!(class = %record.identifier, code = %record.code, "class record outside a class scope; ignored");
                Vec::new()
            }
            Cursor::IgnoredClass { identifier } => {
                if record.code == ReportCode::Done && *identifier == record.identifier {
                    self.cursor = Cursor::Idle;
                }
                Vec::new()
            }
            Cursor::Class(class) if class.group.class_name != record.identifier => {
                tracing::debug!(
                    open = %class.group.class_name,
                    class = %record.identifier,
                    "record for a class other than the open one; ignored"
                );
                Vec::new()
            }
            Cursor::Class(class) => apply_class_lifecycle(class, record),
        }
    }

    fn is_open_class(&self, identifier: &str) -> bool {
        matches!(&self.cursor, Cursor::Class(class) if class.group.class_name == identifier)
    }

    fn open_class(&mut self, record: &ProtocolRecord, selection: &TestCaseSelection) {
        let Some(group) = selection.find_group(&record.identifier) else {
            tracing::warn!(class = %record.identifier, "class is not part of the selection; its output is ignored");
            self.cursor = Cursor::IgnoredClass {
                identifier: record.identifier.clone(),
            };
            return;
        };
        let carried = std::mem::take(&mut self.carried);
        let body = if group.setup_cleanup_per_test_method {
            ClassBody::PerTest {
                class_text: carried,
                method: None,
            }
        } else {
            let mut lifecycle = Lifecycle::new(Stage::Opening);
            lifecycle.setup.text = carried;
            ClassBody::Shared {
                lifecycle,
                drafts: BTreeMap::new(),
                method: None,
            }
        };
        self.opened_class = true;
        self.cursor = Cursor::Class(ClassScope {
            group: Arc::clone(group),
            any_test_started: false,
            body,
        });
    }

    fn close_class(&mut self, selection: &TestCaseSelection) -> Vec<Finished> {
        let Cursor::Class(class) = std::mem::take(&mut self.cursor) else {
            return Vec::new();
        };
        tracing::debug!(class = %class.group.class_name, "class scope closed");

        match class.body {
            ClassBody::Shared {
                lifecycle,
                mut drafts,
                mut method,
            } => {
                close_shared_method(&mut method, &mut drafts);
                selection
                    .group_positions(&class.group)
                    .into_iter()
                    .map(|position| {
                        let draft = drafts.remove(&position);
                        let started = draft.is_some();
                        let draft = draft.unwrap_or_default();
                        Finished {
                            position,
                            verdict: outcome::settle(
                                draft.verdict,
                                started,
                                draft.elapsed,
                                lifecycle.setup.failed,
                                lifecycle.cleanup.failed,
                            ),
                            output: draft.output,
                            setup: lifecycle.setup.clone(),
                            cleanup: lifecycle.cleanup.clone(),
                        }
                    })
                    .collect()
            }
            ClassBody::PerTest { class_text, mut method } => {
                let mut finished = finish_per_test(&mut method);
                let leftover = Section {
                    text: class_text,
                    failed: false,
                };
                let (setup, cleanup) = if class.any_test_started {
                    (Section::default(), leftover)
                } else {
                    (leftover, Section::default())
                };
                let unstarted: Vec<Finished> = selection
                    .group_positions(&class.group)
                    .into_iter()
                    .filter(|position| finished.iter().all(|done| done.position != *position))
                    .map(|position| Finished {
                        position,
                        verdict: Verdict::not_run(),
                        output: String::new(),
                        setup: setup.clone(),
                        cleanup: cleanup.clone(),
                    })
                    .collect();
                finished.extend(unstarted);
                finished
            }
        }
    }

    fn apply_method(&mut self, record: &ProtocolRecord, selection: &TestCaseSelection) -> Vec<Finished> {
        let Cursor::Class(class) = &mut self.cursor else {
            tracing::debug!(method = %record.identifier, "method record outside a resolved class; ignored");
            return Vec::new();
        };
        let group = Arc::clone(&class.group);

        match &mut class.body {
            ClassBody::Shared {
                lifecycle,
                drafts,
                method,
            } => {
                if !continues(method, record) {
                    if record.code != ReportCode::Start {
                        ignore_unopened(record);
                        return Vec::new();
                    }
                    close_shared_method(method, drafts);
                    *method = Some(open_method(&group, record, selection, MethodScope::new));
                }
                let Some(OpenMethod::Tracked(scope)) = method else {
                    return Vec::new();
                };
                scope.elapsed = record.elapsed;
                if record.code == ReportCode::Start {
                    class.any_test_started = true;
                    if lifecycle.stage == Stage::Opening {
                        lifecycle.stage = Stage::Body;
                    }
                } else if scope.apply_verdict(record) {
                    close_shared_method(method, drafts);
                } else {
                    tracing::debug!(
                        method = %record.identifier,
                        code = %record.code,
                        "method-level lifecycle record for a group with shared setup/cleanup; ignored"
                    );
                }
                Vec::new()
            }
            ClassBody::PerTest { class_text, method } => {
                let mut finished = Vec::new();
                if !continues(method, record) {
                    if record.code != ReportCode::Start {
                        ignore_unopened(record);
                        return finished;
                    }
                    finished.extend(finish_per_test(method));
                    let initial = if group.has_setup() || group.instantiates_per_test() {
                        Stage::Opening
                    } else {
                        Stage::Body
                    };
                    *method = Some(open_method(&group, record, selection, |key, positions| {
                        let mut lifecycle = Lifecycle::new(initial);
                        lifecycle.setup.text = std::mem::take(class_text);
                        PerTestScope {
                            scope: MethodScope::new(key, positions),
                            lifecycle,
                        }
                    }));
                }
                let Some(OpenMethod::Tracked(open)) = method else {
                    return finished;
                };
                open.scope.elapsed = record.elapsed;
                if record.code == ReportCode::Start {
                    class.any_test_started = true;
                } else if apply_per_test_code(open, record) {
                    finished.extend(finish_per_test(method));
                }
                finished
            }
        }
    }
}

/// Class-level text and `MethodError`s belong to the opening half until a test has started.
fn in_opening_half(stage: Stage, any_test_started: bool) -> bool {
    match stage {
        Stage::Opening => true,
        Stage::Body => !any_test_started,
        Stage::Closing => false,
    }
}

/// Non-`Start`, non-`Done` class record for the open class.
fn apply_class_lifecycle(class: &mut ClassScope, record: &ProtocolRecord) -> Vec<Finished> {
    let any_test_started = class.any_test_started;
    let closing_half = matches!(
        record.code,
        ReportCode::Cleanup | ReportCode::Dispose | ReportCode::CleanupFail | ReportCode::CleanUpComplete
    );
    match &mut class.body {
        ClassBody::Shared {
            lifecycle,
            drafts,
            method,
        } => {
            if record.code == ReportCode::MethodError {
                let in_opening = in_opening_half(lifecycle.stage, any_test_started);
                if !in_opening {
                    close_shared_method(method, drafts);
                }
                lifecycle.method_error(record.reason_text(), in_opening);
                return Vec::new();
            }
            if closing_half {
                close_shared_method(method, drafts);
            }
            if !lifecycle.apply(record) {
                tracing::debug!(class = %record.identifier, code = %record.code, "unexpected class-level code; ignored");
            }
            Vec::new()
        }
        ClassBody::PerTest { method, .. } => {
            tracing::debug!(
                class = %record.identifier,
                code = %record.code,
                "class-level lifecycle record for a group with per-test setup/cleanup; ignored"
            );
            if closing_half { finish_per_test(method) } else { Vec::new() }
        }
    }
}

/// Apply a non-`Start` record to an open per-method scope. Returns `true` when the record closes the scope.
fn apply_per_test_code(open: &mut PerTestScope, record: &ProtocolRecord) -> bool {
    let lifecycle = &mut open.lifecycle;
    match record.code {
        ReportCode::MethodError => match (lifecycle.stage, lifecycle.phase) {
            (Stage::Opening, SubPhase::Instantiated | SubPhase::SetupRunning) => {
                lifecycle.method_error(record.reason_text(), true);
                true
            }
            (_, SubPhase::CleanupRunning | SubPhase::Disposed) => {
                lifecycle.method_error(record.reason_text(), false);
                true
            }
            _ => {
                open.scope.apply_verdict(record);
                false
            }
        },
        ReportCode::CleanupFail | ReportCode::CleanUpComplete => {
            lifecycle.apply(record);
            true
        }
        _ => {
            if !open.scope.apply_verdict(record) && !lifecycle.apply(record) {
                tracing::debug!(method = %record.identifier, code = %record.code, "unexpected method-level code; ignored");
            }
            false
        }
    }
}

fn ignore_unopened(record: &ProtocolRecord) {
    tracing::debug!(
        method = %record.identifier,
        row = record.data_row_index,
        code = %record.code,
        "record for a method scope that is not open; ignored"
    );
}

fn push_line(buffer: &mut String, line: &str) {
    buffer.push_str(line);
    buffer.push('\n');
}

/// Resolve the record's method inside `group` and open a scope for it, or an ignored slot when nothing matches.
fn open_method<T>(
    group: &TestCaseGroup,
    record: &ProtocolRecord,
    selection: &TestCaseSelection,
    make: impl FnOnce(MethodKey, Vec<usize>) -> T,
) -> OpenMethod<T> {
    let key = MethodKey::of(record);
    let positions = selection.cases_for(group, &key.identifier, key.data_row_index);
    if positions.is_empty() {
        tracing::warn!(
            class = %group.class_name,
            method = %key.identifier,
            row = key.data_row_index,
            "method is not part of the selection; its output is ignored"
        );
        return OpenMethod::Ignored(key);
    }
    OpenMethod::Tracked(make(key, positions))
}

/// Move an open shared-group method scope into the class's drafts.
fn close_shared_method(method: &mut Option<OpenMethod<MethodScope>>, drafts: &mut BTreeMap<usize, CaseDraft>) {
    let Some(OpenMethod::Tracked(scope)) = method.take() else {
        return;
    };
    for position in scope.positions {
        drafts.insert(
            position,
            CaseDraft {
                elapsed: scope.elapsed,
                verdict: scope.verdict.clone(),
                output: scope.output.clone(),
            },
        );
    }
}

/// Close an open per-method scope and settle its cases.
fn finish_per_test(method: &mut Option<OpenMethod<PerTestScope>>) -> Vec<Finished> {
    let Some(OpenMethod::Tracked(PerTestScope { scope, lifecycle })) = method.take() else {
        return Vec::new();
    };
    let verdict = outcome::settle(
        scope.verdict,
        true,
        scope.elapsed,
        lifecycle.setup.failed,
        lifecycle.cleanup.failed,
    );
    scope
        .positions
        .into_iter()
        .map(|position| Finished {
            position,
            verdict: verdict.clone(),
            output: scope.output.clone(),
            setup: lifecycle.setup.clone(),
            cleanup: lifecycle.cleanup.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use nanotest_core::{ClassDeclaration, DeclaredMember, DeviceType, GroupBuilder, TestMarker, TestOutcome};

    use super::*;

    fn selection(per_test: bool) -> TestCaseSelection {
        let mut class = ClassDeclaration::new("NS.Sample", "Tests.pe")
            .with_marker(TestMarker::TestClass)
            .with_member(DeclaredMember::new("Prepare").with_marker(TestMarker::Setup {
                required_config_keys: Vec::new(),
            }))
            .with_member(DeclaredMember::new("First").with_marker(TestMarker::TestMethod))
            .with_member(DeclaredMember::new("Second").with_marker(TestMarker::TestMethod));
        if per_test {
            class = class.with_marker(TestMarker::SetupCleanupPerTestMethod);
        }
        let (built, _) = GroupBuilder::new().build(&class, 0);
        let mut selection = TestCaseSelection::new("Tests.pe", DeviceType::Virtual);
        for case in built.unwrap().cases {
            selection.push(case);
        }
        selection.select_all();
        selection
    }

    fn class(code: ReportCode) -> ProtocolRecord {
        ProtocolRecord::new(RecordScope::Class, "NS.Sample", 0, code)
    }

    fn method(name: &str, code: ReportCode) -> ProtocolRecord {
        ProtocolRecord::new(RecordScope::Method, format!("NS.Sample.{name}"), 10_000, code)
    }

    #[test]
    fn test_text_routing_in_shared_group() {
        let selection = selection(false);
        let mut tracker = ScopeTracker::new();

        assert_eq!(tracker.route_text("deploying"), TextRoute::Deployment);
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&class(ReportCode::Setup), &selection);
        assert_eq!(tracker.route_text("in setup"), TextRoute::Captured);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        tracker.route_text("in first");
        tracker.apply(&method("First", ReportCode::Pass), &selection);
        tracker.route_text("between tests");

        let Cursor::Class(ClassScope {
            body: ClassBody::Shared { lifecycle, drafts, .. },
            ..
        }) = tracker.cursor()
        else {
            panic!("expected an open shared class");
        };
        assert_eq!(lifecycle.setup.text, "in setup\n");
        assert_eq!(lifecycle.cleanup.text, "between tests\n");
        assert_eq!(drafts[&0].output, "in first\n");
    }

    #[test]
    fn test_shared_results_wait_for_class_close() {
        let selection = selection(false);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        assert!(tracker.apply(&method("First", ReportCode::Pass), &selection).is_empty());

        let finished = tracker.apply(&class(ReportCode::Done), &selection);
        assert_eq!(finished.len(), 2);
        assert_eq!(finished[0].verdict.outcome, TestOutcome::Passed);
        assert_eq!(finished[1].verdict.outcome, TestOutcome::None);
        assert!(matches!(tracker.cursor(), Cursor::Idle));
    }

    #[test]
    fn test_per_test_scope_emits_on_cleanup_complete() {
        let selection = selection(true);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        tracker.route_text("before setup");
        tracker.apply(&method("First", ReportCode::Setup), &selection);
        tracker.apply(&method("First", ReportCode::SetupComplete), &selection);
        tracker.route_text("body");
        tracker.apply(&method("First", ReportCode::Pass), &selection);
        tracker.apply(&method("First", ReportCode::Cleanup), &selection);
        tracker.route_text("tearing down");

        let finished = tracker.apply(&method("First", ReportCode::CleanUpComplete), &selection);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].verdict.outcome, TestOutcome::Passed);
        assert_eq!(finished[0].setup.text, "before setup\n");
        assert_eq!(finished[0].output, "body\n");
        assert_eq!(finished[0].cleanup.text, "tearing down\n");
    }

    #[test]
    fn test_only_start_opens_a_method_scope() {
        let selection = selection(false);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Pass), &selection);
        tracker.apply(&method("First", ReportCode::Dispose), &selection);
        tracker.apply(&method("First", ReportCode::Fail), &selection);
        tracker.apply(&method("Second", ReportCode::Pass), &selection);

        let finished = tracker.close_all(&selection);
        assert_eq!(finished[0].verdict.outcome, TestOutcome::Passed);
        assert_eq!(finished[1].verdict.outcome, TestOutcome::None);
    }

    #[test]
    fn test_text_between_classes_reaches_the_next_method() {
        let selection = selection(true);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&class(ReportCode::Done), &selection);
        assert_eq!(tracker.route_text("between"), TextRoute::Captured);
        tracker.apply(&class(ReportCode::Start), &selection);
        assert_eq!(tracker.route_text("lead-in"), TextRoute::Captured);
        tracker.apply(&method("First", ReportCode::Start), &selection);

        let Cursor::Class(ClassScope {
            body:
                ClassBody::PerTest {
                    class_text,
                    method: Some(OpenMethod::Tracked(open)),
                },
            ..
        }) = tracker.cursor()
        else {
            panic!("expected an open per-test method scope");
        };
        assert!(class_text.is_empty());
        assert_eq!(open.lifecycle.setup.text, "between\nlead-in\n");
        assert!(tracker.take_carried().is_empty());
    }

    #[test]
    fn test_per_test_class_close_reports_unstarted_cases() {
        let selection = selection(true);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Pass), &selection);
        tracker.apply(&method("First", ReportCode::CleanUpComplete), &selection);
        tracker.route_text("after the last test");

        let finished = tracker.apply(&class(ReportCode::Done), &selection);
        assert_eq!(finished.len(), 2);
        let second = finished.iter().find(|done| done.position == 1).unwrap();
        assert_eq!(second.verdict.outcome, TestOutcome::None);
        assert_eq!(second.cleanup.text, "after the last test\n");
    }

    #[test]
    fn test_unknown_class_is_ignored() {
        let selection = selection(false);
        let mut tracker = ScopeTracker::new();
        let other = ProtocolRecord::new(RecordScope::Class, "NS.Other", 0, ReportCode::Start);
        tracker.apply(&other, &selection);
        assert_eq!(tracker.route_text("noise"), TextRoute::Discarded);

        let done = ProtocolRecord::new(RecordScope::Class, "NS.Other", 0, ReportCode::Done);
        assert!(tracker.apply(&done, &selection).is_empty());
        assert_eq!(tracker.route_text("after"), TextRoute::Deployment);
    }

    #[test]
    fn test_lifecycle_records_at_wrong_level_are_ignored() {
        let selection = selection(false);
        let mut tracker = ScopeTracker::new();
        tracker.apply(&class(ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::Start), &selection);
        tracker.apply(&method("First", ReportCode::SetupFail), &selection);
        tracker.apply(&method("First", ReportCode::Pass), &selection);

        let finished = tracker.close_all(&selection);
        assert_eq!(finished[0].verdict.outcome, TestOutcome::Passed);
        assert!(!finished[0].setup.failed);
    }
}
