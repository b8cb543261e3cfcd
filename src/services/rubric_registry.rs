//! 评分标准注册表
//!
//! 作业配置中的 `prompt` 字段是标准标识（如 `MultiplyPrompt`），启动时在
//! 静态表中解析，未注册的标识直接报配置错误。
//!
//! 每份完整提示词由三部分组成：通用评分原则、作业专属标准、输出格式约定。
//! `%s` 占位符由学生代码替换。

use phf::phf_map;

use crate::error::ConfigError;

/// 代码占位符
const CODE_PLACEHOLDER: &str = "%s";

/// 没有提交代码时填入的内容
const EMPTY_SUBMISSION: &str = "// No code submitted";

/// 通用评分原则
const GRADING_PHILOSOPHY: &str = "\
GRADING PHILOSOPHY - READ FIRST:

Judge whether the student's app behaves as the MVP requirements describe.
A working MVP earns full MVP credit; stretch goals add bonus points up to a total of 10/10.

1. Functionality first: accept any valid implementation that produces the required behavior.
2. Benefit of the doubt: if the code compiles and the behavior is present, award the credit.
3. Deduct only when a requirement is missing, non-functional, or blocked by major syntax errors.
4. Commented-out code never counts.
5. Only count a stretch goal when the working implementation is present, and never list a
   completed stretch goal as missing in the feedback.

These are intro-level students: be generous when the behavior is there, strict only when it is absent.
";

/// 输出格式约定
const OUTPUT_CONTRACT: &str = r#"
STUDENT CODE:
%s

RESPOND WITH ONLY VALID JSON (no extra text before or after):
{
  "score": X.X,
  "maxScore": 10,
  "mvpComplete": true/false,
  "stretchGoalsCompleted": ["stretch1", "stretch2"],
  "feedback": {
    "studentSummary": "2-3 sentence summary of performance and next steps",
    "strengths": ["specific strength"],
    "improvements": ["specific improvement"],
    "syntaxErrors": ["syntax error if any"]
  },
  "compileIssues": "none/minor/major"
}

"feedback.studentSummary" must be 2-3 complete sentences naming the key strengths and exactly
what to improve next. When the score is 10/10, use one celebratory sentence instead.
"#;

/// 作业专属评分标准
static RUBRICS: phf::Map<&'static str, &'static str> = phf_map! {
    "MultiplyPrompt" => "\
You are grading a SwiftUI Multiply app.

MVP (8 points, all required for mvpComplete=true):
1. Two TextFields that accept numeric input (3 pts).
2. The product of the two numbers is calculated and shown in a visible view (3 pts).
3. The code compiles and uses camelCase names with correct $ bindings (2 pts).

STRETCH GOALS (0.5 each):
stretch1: the keyboard dismisses after calculating.
stretch2: a result of exactly 64 shows a picture.
stretch3: even and odd results show different pictures.
stretch4: a clear action resets both fields, the result, and any image.
stretch5: add, subtract, divide and modulus operations are available.
stretch6: two sliders drive the TextField values.
",
    "ButtonsPrompt" => "\
You are grading a SwiftUI Buttons Challenge.

MVP (8 points, 2 each, all required for mvpComplete=true):
1. Two square red buttons side by side labelled 1 and 2 in white.
2. The two buttons use different Button initializer styles (title + action vs action + label).
3. Each button prints a distinct message such as \"Button #1 Was Pressed\" when tapped.
4. The layout lives inside the provided MARK section without breaking the scaffold.

STRETCH GOALS (0.5 each):
stretch1: a rounded blue button toggles changeBackground and the root background changes.
stretch2: a gray capsule button shows and increments counter.
stretch3: a circular green button sets showAlert and an alert titled \"Stretch #3 Complete\" appears.
stretch4: a lightbulb button toggles lightBulbStatus, swapping the icon and an On/Off label.
",
    "ConstantsVariablesDatatypesPrompt" => "\
You are grading a Swift Constants, Variables and Data Types exercise.

MVP (8 points, all required for mvpComplete=true):
1. Constants are declared with let and variables with var where the value changes (2 pts).
2. String, Int, Double and Bool values are each declared, with explicit or inferred types (2 pts).
3. String interpolation combines the values into printed sentences (2 pts).
4. The code compiles and follows camelCase naming (2 pts).

STRETCH GOALS (0.5 each):
stretch1: type conversion between numeric types or from String with optional handling.
stretch2: compound assignment operators update a variable.
stretch3: a tuple or typealias groups related values.
stretch4: the values are shown in a SwiftUI view instead of only printed.
",
    "OperatorsChallengePrompt" => "\
You are grading a Swift Operators Challenge.

MVP (8 points, all required for mvpComplete=true):
1. Arithmetic operators (+ - * / %) are each used correctly (3 pts).
2. Comparison operators produce Bool results that are printed or displayed (2 pts).
3. Logical operators (&&, ||, !) combine conditions (2 pts).
4. The code compiles (1 pt).

STRETCH GOALS (0.5 each):
stretch1: the ternary conditional operator chooses a value.
stretch2: the nil-coalescing operator supplies a default.
stretch3: range operators drive a loop or a switch.
stretch4: results are presented in a SwiftUI view.
",
    "ConditionalsChallengePrompt" => "\
You are grading a Swift Conditionals Challenge.

MVP (8 points, all required for mvpComplete=true):
1. if / else if / else branches choose between at least three outcomes (3 pts).
2. A switch statement covers its cases, including default where needed (3 pts).
3. The code compiles and the branches are reachable (2 pts).

STRETCH GOALS (0.5 each):
stretch1: a switch uses ranges or tuples in its patterns.
stretch2: guard exits early on invalid input.
stretch3: the outcome is driven by user input in a SwiftUI view.
stretch4: where clauses refine switch cases.
",
    "FunctionsChallengePrompt" => "\
You are grading a Swift Functions Challenge.

MVP (8 points, all required for mvpComplete=true):
1. At least two functions with parameters and return values (3 pts).
2. The functions are called and their results used or displayed (3 pts).
3. The code compiles with correct argument labels (2 pts).

STRETCH GOALS (0.5 each):
stretch1: a function uses default parameter values.
stretch2: a function returns a tuple or an optional.
stretch3: a closure is passed to or returned from a function.
stretch4: an inout parameter or variadic parameter is used correctly.
",
    "ClassesChallengePrompt" => "\
You are grading a Swift Classes Challenge.

MVP (8 points, all required for mvpComplete=true):
1. A class with stored properties and an initializer (3 pts).
2. At least one method that reads or changes the properties (3 pts).
3. Instances are created and used, and the code compiles (2 pts).

STRETCH GOALS (0.5 each):
stretch1: a subclass overrides a method.
stretch2: a computed property is defined.
stretch3: the class is observed from a SwiftUI view.
stretch4: access control hides internal state.
",
    "EventsChallengePrompt" => "\
You are grading a SwiftUI Events and Event Handlers Challenge.

MVP (8 points, all required for mvpComplete=true):
1. The provided scaffold is intact and the image is shown from the imageName state (1 pt).
2. The Image has an .onAppear closure whose conditional toggles imageName between the two image names (3 pts).
3. The Image has an .onDisappear closure that increases size by 50 (3 pts).
4. The code compiles with correct modifier syntax (1 pt).

STRETCH GOALS (1.0 each, at most +2):
stretch1: a TextField bound to enteredText uses .onSubmit to copy the text into imageName, reset size to 100 and clear the field.
stretch2: a tap gesture increments arrowNumber and a switch cycles arrowImage through up, right, down and left, wrapping around.
stretch3: a long press of about 5 seconds presents an alert containing a TextField bound to size.
",
    "FinalGradeCalculatorPrompt" => "\
You are grading a SwiftUI Final Grade Calculator app.

MVP (8 points, all required for mvpComplete=true):
1. Inputs bound to state for current grade, desired final grade and exam weight (2 pts).
2. A button or other interaction triggers the calculation (2 pts).
3. The required exam score is computed as (desired - current * (1 - weight)) / weight or an equivalent (3 pts).
4. The result is displayed to the user (1 pt).

STRETCH GOALS (0.5 each, at most +2):
stretch1: the background turns green under 100% and red above it.
stretch2: a message suggests asking for extra credit when the required score is above 100%.
stretch3: a segmented picker selects the desired letter grade and converts it to a number.
stretch4: a non-segmented picker selects the desired letter grade and converts it to a number.
stretch5: text uses custom fonts, sizes and colors with good contrast.
stretch6: text fields and buttons share a consistent style.
stretch7: padding and spacing keep the layout uncluttered.
stretch8: numeric keyboards are used and the keyboard can be dismissed.
stretch9: the layout adapts to different screen sizes.
stretch10: invalid input is rejected with a visible message.
",
    "PropertyWrappersChallengePrompt" => "\
You are grading a SwiftUI Property Wrappers Challenge (@State, @Binding, @StateObject, @EnvironmentObject, @Published).

MVP (8 points, 2 each, all required for mvpComplete=true):
1. ContentView declares @State word1 and word2 (String) and number (Int), initialized to \"\" and 0.
2. MVPView declares word1Reference as @State and word2Reference and numberReference as @Binding, typed and uninitialized.
3. ContentView presents MVPView passing the three values, using $ for the bindings.
4. Navigation works and the wrappers show the difference: word1 stays unchanged, word2 and number reflect edits.

STRETCH GOALS (1.0 each, at most +2):
stretch1: an ObservableObject Contact with @Published name, address and phone is created as a @StateObject, injected with .environmentObject and read through @EnvironmentObject in every view that needs it.
stretch2: a @propertyWrapper BetweenOneAndTen clamps its wrappedValue to 1...10 and is applied to a BoundedNumber property.
",
    "TextFieldsChallengePrompt" => "\
You are grading a SwiftUI TextFields Challenge.

MVP (8 points, all required for mvpComplete=true):
1. A rounded TextField with the placeholder \"Enter your name\" (any rounded styling counts) (2 pts).
2. The view shows \"Hello <name>\" once a name is entered (3 pts).
3. The code compiles (1 pt).
4. camelCase names and correct $ bindings on the TextField (1 pt).

STRETCH GOALS (0.5 each, at most +2):
stretch1: two rounded number-pad TextFields in an HStack bound to number1 and number2, with the equation line shown.
stretch2: a centered, roughly 300x50 TextField bound to billAmount formatted as USD currency.
stretch3: an email TextField without autocapitalization and a SecureField password, both rounded, with the button and alert present.
stretch4: two TextFields whose focus sets field1Complain or field2Complain and shows the matching alert.
",
    "ViewsSubViewsNavigationPrompt" => "\
You are grading a SwiftUI Views, SubViews and Navigation Challenge.

MVP (8 points, 2 each, all required for mvpComplete=true):
1. A blue view labelled \"Blue View\" at the top.
2. A green view labelled \"Green View\" below it.
3. A red view labelled \"Red View\" below the green view.
4. A NavigationLink \"Go To The Yellow View\" at the bottom that opens a yellow view labelled \"Yellow View\".

STRETCH GOALS (1.0 each, at most +2):
stretch1: a Stretch #1 tab shows tic-tac-toe with the winning move in a different color.
stretch2: a Stretch #2 tab shows two system images that link to pages each showing an image.
",
};

/// 已注册的标准标识（排序后）
pub fn registered_rubrics() -> Vec<&'static str> {
    let mut ids: Vec<_> = RUBRICS.keys().copied().collect();
    ids.sort_unstable();
    ids
}

/// 组装完整的评分提示词
pub fn resolve_rubric(identifier: &str) -> Result<String, ConfigError> {
    let criteria = RUBRICS
        .get(identifier.trim())
        .ok_or_else(|| ConfigError::UnknownRubric(identifier.to_string()))?;
    Ok(format!("{}\n{}{}", GRADING_PHILOSOPHY, criteria, OUTPUT_CONTRACT))
}

/// 作业评分提示词
#[derive(Debug, Clone)]
pub struct AssignmentPrompt {
    text: String,
}

impl AssignmentPrompt {
    pub fn new(text: impl Into<String>) -> Result<Self, ConfigError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ConfigError::BlankRubric);
        }
        Ok(Self { text })
    }

    /// 按标识从注册表创建
    pub fn from_registry(identifier: &str) -> Result<Self, ConfigError> {
        Self::new(resolve_rubric(identifier)?)
    }

    /// 注入学生代码
    pub fn build_prompt(&self, code: &str) -> String {
        let code = if code.trim().is_empty() {
            EMPTY_SUBMISSION
        } else {
            code
        };
        self.text.replace(CODE_PLACEHOLDER, code)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rubric_has_single_placeholder() {
        for id in registered_rubrics() {
            let prompt = resolve_rubric(id).unwrap();
            assert_eq!(prompt.matches(CODE_PLACEHOLDER).count(), 1, "{id}");
            assert!(prompt.starts_with("GRADING PHILOSOPHY"));
            assert!(prompt.contains("\"maxScore\": 10"));
        }
    }

    #[test]
    fn test_registry_covers_all_course_rubrics() {
        let ids = registered_rubrics();
        assert_eq!(ids.len(), 12);
        for id in [
            "EventsChallengePrompt",
            "FinalGradeCalculatorPrompt",
            "PropertyWrappersChallengePrompt",
            "TextFieldsChallengePrompt",
            "ViewsSubViewsNavigationPrompt",
        ] {
            assert!(ids.contains(&id), "{id}");
        }
        let calculator = resolve_rubric("FinalGradeCalculatorPrompt").unwrap();
        assert!(calculator.contains("stretch10:"));
    }

    #[test]
    fn test_unknown_identifier() {
        let err = AssignmentPrompt::from_registry("NopePrompt").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRubric(id) if id == "NopePrompt"));
    }

    #[test]
    fn test_blank_rubric_rejected() {
        assert!(matches!(
            AssignmentPrompt::new("  \n"),
            Err(ConfigError::BlankRubric)
        ));
    }

    #[test]
    fn test_build_prompt_injects_code() {
        let prompt = AssignmentPrompt::new("Grade this:\n%s\nEnd").unwrap();
        assert_eq!(
            prompt.build_prompt("let x = 1"),
            "Grade this:\nlet x = 1\nEnd"
        );
        assert_eq!(
            prompt.build_prompt("   "),
            "Grade this:\n// No code submitted\nEnd"
        );

        let multiply = AssignmentPrompt::from_registry("MultiplyPrompt").unwrap();
        let built = multiply.build_prompt("struct ContentView: View {}");
        assert!(built.contains("struct ContentView: View {}"));
        assert!(!built.contains(CODE_PLACEHOLDER));
    }
}
