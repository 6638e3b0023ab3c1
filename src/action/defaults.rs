//! The default Vim command table.

use super::commands::{Edit, LineEdit, Put, SessionAction, SessionCommand, Short, Shorthand};
use super::insert::{InsertAction, InsertAt, InsertCommand, InsertModeCommand};
use super::motions::{Motion, MotionKind};
use super::operators::{Operator, OperatorKind};
use super::text_objects::{ObjectKind, TextObject};
use super::visual::{Reselect, SwapEnds, SwapVisualSelect, ToggleVisual, VisualAction, VisualCommand};
use super::{ActionHandler, ActionRegistry};
use crate::mode::{MappingModes, SubMode, VisualKind};
use crate::range::MotionType;
use crate::text::{CharClass, FindKind};
use std::rc::Rc;

fn bind(registry: &mut ActionRegistry, modes: MappingModes, keys: &[&str], handler: impl ActionHandler + 'static) {
    let handler: Rc<dyn ActionHandler> = Rc::new(handler);
    for k in keys {
        registry.register(modes, k, Rc::clone(&handler));
    }
}

pub(super) fn register_all(r: &mut ActionRegistry) {
    motions(r);
    text_objects(r);
    normal(r);
    visual(r);
    insert(r);
}

fn motions(r: &mut ActionRegistry) {
    use MotionKind as K;
    use MotionType::{Exclusive, Inclusive, LineWise};
    let m = MappingModes::NXO;

    bind(r, m, &["h", "<Left>", "<BS>"], Motion::new("MotionLeft", K::Left, Exclusive));
    bind(r, m, &["l", "<Right>", "<Space>"], Motion::new("MotionRight", K::Right, Exclusive));
    bind(r, m, &["j", "<Down>", "<C-n>"], Motion::new("MotionDown", K::Down, LineWise));
    bind(r, m, &["k", "<Up>", "<C-p>"], Motion::new("MotionUp", K::Up, LineWise));

    bind(r, m, &["w"], Motion::new("MotionWordRight", K::WordForward(CharClass::Word), Exclusive));
    bind(r, m, &["W"], Motion::new("MotionBigWordRight", K::WordForward(CharClass::WORD), Exclusive));
    bind(r, m, &["b"], Motion::new("MotionWordLeft", K::WordBackward(CharClass::Word), Exclusive));
    bind(r, m, &["B"], Motion::new("MotionBigWordLeft", K::WordBackward(CharClass::WORD), Exclusive));
    bind(r, m, &["e"], Motion::new("MotionWordEndRight", K::WordEnd(CharClass::Word), Inclusive));
    bind(r, m, &["E"], Motion::new("MotionBigWordEndRight", K::WordEnd(CharClass::WORD), Inclusive));
    bind(r, m, &["ge"], Motion::new("MotionWordEndLeft", K::WordEndBackward(CharClass::Word), Inclusive));
    bind(r, m, &["gE"], Motion::new("MotionBigWordEndLeft", K::WordEndBackward(CharClass::WORD), Inclusive));

    bind(r, m, &["0", "<Home>"], Motion::new("MotionFirstColumn", K::LineStart, Exclusive));
    bind(r, m, &["^"], Motion::new("MotionFirstNonSpace", K::FirstNonBlank, Exclusive));
    bind(r, m, &["$", "<End>"], Motion::new("MotionLastColumn", K::LineEnd, Inclusive));
    bind(r, m, &["_"], Motion::new(ActionRegistry::LINE_MOTION, K::LineDown, LineWise));
    bind(r, m, &["gg"], Motion::new("MotionGotoLineFirst", K::FirstLine, LineWise).jump());
    bind(r, m, &["G"], Motion::new("MotionGotoLineLast", K::LastLine, LineWise).jump());

    bind(r, m, &["f"], Motion::new("MotionRightMatchChar", K::Find(FindKind::Forward), Inclusive));
    bind(r, m, &["t"], Motion::new("MotionRightTillMatchChar", K::Find(FindKind::ForwardTill), Inclusive));
    bind(r, m, &["F"], Motion::new("MotionLeftMatchChar", K::Find(FindKind::Backward), Exclusive));
    bind(r, m, &["T"], Motion::new("MotionLeftTillMatchChar", K::Find(FindKind::BackwardTill), Exclusive));
    bind(r, m, &[";"], Motion::new("MotionLastMatchChar", K::RepeatFind { reverse: false }, Inclusive));
    bind(r, m, &[","], Motion::new("MotionLastMatchCharReverse", K::RepeatFind { reverse: true }, Inclusive));

    bind(r, m, &["}"], Motion::new("MotionParagraphNext", K::ParagraphForward, Exclusive).jump());
    bind(r, m, &["{"], Motion::new("MotionParagraphPrevious", K::ParagraphBackward, Exclusive).jump());
    bind(r, m, &["/"], Motion::new("SearchEntryFwd", K::Search { forward: true }, Exclusive).jump());
    bind(r, m, &["?"], Motion::new("SearchEntryRev", K::Search { forward: false }, Exclusive).jump());
    bind(r, m, &["n"], Motion::new("SearchAgainNext", K::SearchNext { reverse: false }, Exclusive).jump());
    bind(r, m, &["N"], Motion::new("SearchAgainPrevious", K::SearchNext { reverse: true }, Exclusive).jump());
}

fn text_objects(r: &mut ActionRegistry) {
    let m = MappingModes::XO;
    let objects: &[(&str, &str, &'static str, &'static str, ObjectKind)] = &[
        ("iw", "aw", "MotionInnerWord", "MotionOuterWord", ObjectKind::Word(CharClass::Word)),
        ("iW", "aW", "MotionInnerBigWord", "MotionOuterBigWord", ObjectKind::Word(CharClass::WORD)),
        ("i\"", "a\"", "MotionInnerDoubleQuote", "MotionOuterDoubleQuote", ObjectKind::Quote('"')),
        ("i'", "a'", "MotionInnerSingleQuote", "MotionOuterSingleQuote", ObjectKind::Quote('\'')),
        ("i`", "a`", "MotionInnerBackQuote", "MotionOuterBackQuote", ObjectKind::Quote('`')),
        ("i(", "a(", "MotionInnerParen", "MotionOuterParen", ObjectKind::Pair('(', ')')),
        ("i[", "a[", "MotionInnerBracket", "MotionOuterBracket", ObjectKind::Pair('[', ']')),
        ("i{", "a{", "MotionInnerBrace", "MotionOuterBrace", ObjectKind::Pair('{', '}')),
        ("i<lt>", "a<lt>", "MotionInnerAngle", "MotionOuterAngle", ObjectKind::Pair('<', '>')),
        ("ip", "ap", "MotionInnerParagraph", "MotionOuterParagraph", ObjectKind::Paragraph),
    ];
    for &(inner_keys, outer_keys, inner_id, outer_id, kind) in objects {
        bind(r, m, &[inner_keys], TextObject::new(inner_id, kind, true));
        bind(r, m, &[outer_keys], TextObject::new(outer_id, kind, false));
    }
    // Aliases by closing char and letter.
    let aliases: &[(&[&str], &[&str], &'static str, &'static str, ObjectKind)] = &[
        (&["i)", "ib"], &["a)", "ab"], "MotionInnerParen", "MotionOuterParen", ObjectKind::Pair('(', ')')),
        (&["i]"], &["a]"], "MotionInnerBracket", "MotionOuterBracket", ObjectKind::Pair('[', ']')),
        (&["i}", "iB"], &["a}", "aB"], "MotionInnerBrace", "MotionOuterBrace", ObjectKind::Pair('{', '}')),
        (&["i>"], &["a>"], "MotionInnerAngle", "MotionOuterAngle", ObjectKind::Pair('<', '>')),
    ];
    for &(inner_keys, outer_keys, inner_id, outer_id, kind) in aliases {
        bind(r, m, inner_keys, TextObject::new(inner_id, kind, true));
        bind(r, m, outer_keys, TextObject::new(outer_id, kind, false));
    }
}

fn normal(r: &mut ActionRegistry) {
    let n = MappingModes::NORMAL;

    bind(r, n, &["i", "<Insert>"], InsertCommand::new("InsertBeforeCursor", InsertAt::Before));
    bind(r, n, &["a"], InsertCommand::new("InsertAfterCursor", InsertAt::After));
    bind(r, n, &["I"], InsertCommand::new("InsertBeforeFirstNonBlank", InsertAt::FirstNonBlank));
    bind(r, n, &["gI"], InsertCommand::new("InsertLineStart", InsertAt::ColumnZero));
    bind(r, n, &["A"], InsertCommand::new("InsertAfterLineEnd", InsertAt::LineEnd));
    bind(r, n, &["o"], InsertCommand::new("InsertNewLineBelow", InsertAt::LineBelow));
    bind(r, n, &["O"], InsertCommand::new("InsertNewLineAbove", InsertAt::LineAbove));
    bind(r, n, &["gi"], InsertCommand::new("InsertAtPreviousInsert", InsertAt::LastInsert));
    bind(r, n, &["R"], InsertCommand::new("ChangeReplace", InsertAt::Replace));

    bind(r, n, &["x", "<Del>"], Shorthand::new("DeleteCharacter", OperatorKind::Delete, Short::CharsRight));
    bind(r, n, &["X"], Shorthand::new("DeleteCharacterLeft", OperatorKind::Delete, Short::CharsLeft));
    bind(r, n, &["D"], Shorthand::new("DeleteEndOfLine", OperatorKind::Delete, Short::ToLineEnd));
    bind(r, n, &["s"], Shorthand::new("ChangeCharacters", OperatorKind::Change, Short::CharsRight));
    bind(r, n, &["S"], Shorthand::new("ChangeLine", OperatorKind::Change, Short::Lines));
    bind(r, n, &["C"], Shorthand::new("ChangeEndOfLine", OperatorKind::Change, Short::ToLineEnd));
    bind(r, n, &["Y"], Shorthand::new("CopyLine", OperatorKind::Yank, Short::Lines));

    bind(r, n, &["d"], Operator::new("OperatorDelete", OperatorKind::Delete));
    bind(r, n, &["c"], Operator::new("OperatorChange", OperatorKind::Change));
    bind(r, n, &["y"], Operator::new("OperatorYank", OperatorKind::Yank));
    bind(r, n, &[">"], Operator::new("OperatorShiftRight", OperatorKind::ShiftRight));
    bind(r, n, &["<lt>"], Operator::new("OperatorShiftLeft", OperatorKind::ShiftLeft));
    bind(r, n, &["g~"], Operator::new("OperatorToggleCase", OperatorKind::ToggleCase));
    bind(r, n, &["gu"], Operator::new("OperatorLowerCase", OperatorKind::Lower));
    bind(r, n, &["gU"], Operator::new("OperatorUpperCase", OperatorKind::Upper));
    bind(r, n, &["g@"], Operator::new("OperatorFunction", OperatorKind::Function));

    bind(r, n, &["p"], Put::new("PutTextAfterCursor", false));
    bind(r, n, &["P"], Put::new("PutTextBeforeCursor", true));
    bind(r, n, &["J"], LineEdit::new("DeleteJoinLines", Edit::Join));
    bind(r, n, &["r"], LineEdit::new("ChangeCharacter", Edit::ReplaceChar));
    bind(r, n, &["~"], LineEdit::new("ChangeCaseToggleCharacter", Edit::ToggleCase));

    bind(r, n, &["u"], SessionCommand::new("Undo", SessionAction::Undo));
    bind(r, n, &["<C-r>"], SessionCommand::new("Redo", SessionAction::Redo));
    bind(r, n, &["q"], SessionCommand::new("ToggleRecording", SessionAction::ToggleRecording));
    bind(r, n, &["@"], SessionCommand::new("PlaybackRegister", SessionAction::PlayMacro));
    bind(r, n, &["."], SessionCommand::new("RepeatChange", SessionAction::Repeat));
    bind(r, n, &[":"], SessionCommand::new("ExEntry", SessionAction::ExEntry));

    let nx = MappingModes::NX;
    bind(r, nx, &["v"], ToggleVisual::new("VisualToggleCharacterMode", VisualKind::Visual, SubMode::VisualCharacter));
    bind(r, nx, &["V"], ToggleVisual::new("VisualToggleLineMode", VisualKind::Visual, SubMode::VisualLine));
    bind(r, nx, &["<C-v>", "<C-q>"], ToggleVisual::new("VisualToggleBlockMode", VisualKind::Visual, SubMode::VisualBlock));
    bind(r, nx, &["gv"], Reselect);
    bind(r, n, &["gh"], ToggleVisual::new("SelectEnableCharacterMode", VisualKind::Select, SubMode::VisualCharacter));
    bind(r, n, &["gH"], ToggleVisual::new("SelectEnableLineMode", VisualKind::Select, SubMode::VisualLine));
    bind(r, n, &["g<C-h>"], ToggleVisual::new("SelectEnableBlockMode", VisualKind::Select, SubMode::VisualBlock));
}

fn visual(r: &mut ActionRegistry) {
    use OperatorKind as Op;
    use VisualAction as A;
    let x = MappingModes::X;

    bind(r, x, &["d", "x", "<Del>"], VisualCommand::new("VisualDeleteSelection", A::Operator(Op::Delete)));
    bind(r, x, &["D", "X"], VisualCommand::new("VisualDeleteLines", A::LineOperator(Op::Delete)));
    bind(r, x, &["c", "s"], VisualCommand::new("VisualChange", A::Operator(Op::Change)));
    bind(r, x, &["C", "S", "R"], VisualCommand::new("VisualChangeLines", A::LineOperator(Op::Change)));
    bind(r, x, &["y"], VisualCommand::new("VisualYank", A::Operator(Op::Yank)));
    bind(r, x, &["Y"], VisualCommand::new("VisualYankLines", A::LineOperator(Op::Yank)));
    bind(r, x, &[">"], VisualCommand::new("VisualShiftRight", A::Operator(Op::ShiftRight)));
    bind(r, x, &["<lt>"], VisualCommand::new("VisualShiftLeft", A::Operator(Op::ShiftLeft)));
    bind(r, x, &["~", "g~"], VisualCommand::new("VisualToggleCase", A::Operator(Op::ToggleCase)));
    bind(r, x, &["u", "gu"], VisualCommand::new("VisualLowerCase", A::Operator(Op::Lower)));
    bind(r, x, &["U", "gU"], VisualCommand::new("VisualUpperCase", A::Operator(Op::Upper)));
    bind(r, x, &["g@"], VisualCommand::new("VisualOperatorFunction", A::Operator(Op::Function)));
    bind(r, x, &["r"], VisualCommand::new("VisualReplaceCharacter", A::ReplaceChar));
    bind(r, x, &["J"], VisualCommand::new("VisualJoinLines", A::Join));
    bind(r, x, &["p", "P"], VisualCommand::new("VisualPutText", A::Put));
    bind(r, x, &["o", "O"], SwapEnds);

    bind(r, MappingModes::V, &["<C-g>"], SwapVisualSelect);
    bind(
        r,
        MappingModes::SELECT,
        &["<BS>", "<Del>"],
        VisualCommand::new("SelectDeleteSelection", A::Operator(Op::Delete)),
    );
}

fn insert(r: &mut ActionRegistry) {
    let i = MappingModes::INSERT;
    bind(r, i, &["<Esc>", "<C-[>", "<C-c>"], InsertModeCommand::new("InsertExit", InsertAction::Exit));
    bind(r, i, &["<C-w>"], InsertModeCommand::new("InsertDeletePreviousWord", InsertAction::DeleteWordBefore));
    bind(r, i, &["<C-u>"], InsertModeCommand::new("InsertDeleteInsertedText", InsertAction::DeleteLineBefore));
    bind(r, i, &["<C-r>"], InsertModeCommand::new("InsertRegister", InsertAction::PutRegister));
    bind(r, i, &["<Insert>"], InsertModeCommand::new("InsertInsert", InsertAction::ToggleReplace));
    bind(r, i, &["<C-o>"], InsertModeCommand::new("InsertSingleCommand", InsertAction::SingleCommand));
}
