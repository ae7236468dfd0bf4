/*!

This is the long-form manual for `survey_tabulation` and `surveydash`.

## Inputs

Two tables are needed: the datamap (codebook) and the responses.

### Datamap

An Excel workbook (worksheet `Data Map` by default) or a CSV file with the following columns:

| variable | topic   | question_text              | chart_title | chart_subtitle | panel_title | panel_subtitle | encoding              |
|----------|---------|----------------------------|-------------|----------------|-------------|----------------|-----------------------|
| q1       | Economy | Is the economy doing well? | Economy     | All adults     | Q1          |                | 1=Yes 2=No 99=DK      |

The `encoding` legend is a list of `code=label` pairs separated by spaces. A new pair starts at any
whitespace followed by a digit, so labels must not contain a space followed by a number.
When the legend cannot be read, the answers are displayed with their raw codes.

Every variable must be described once. A question text shared by several variables is accepted
(the first variable is used) unless `strictQuestions` is set in the configuration.

### Responses

The responses are read from a CSV file or an Excel workbook, either from the local disk or from
Dropbox. Three layouts are supported:

- `wide`: one row per respondent. It contains a `year` column, the demographic columns
  (`political_aff`, `ethnicity`), optionally a weight column, and one column per survey variable.

```text
year,political_aff,ethnicity,q1,q2
2023,Democrat,Hispanic,1,2
2024,,White,99,1
```

- `long`: one row per answer, with the columns `variable`, `year`, `answer` and the optional
  demographic and weight columns.

- `aggregated`: already tabulated percentages, with the columns `variable`, `year`,
  `sample_group`, `answer`, `percentage`. The sample group is read as the political affiliation
  unless configured otherwise.

## Tabulation

1. The question is looked up by its exact text (within the topic, if one is selected).
2. Only the responses to that variable and to the selected years are kept (no year selected
   means all the years).
3. When requested, the "don't know" answers are removed: `Don't know/No answer`,
   `Don't Know/No Answer`, `Prefer not to say`, `No answer`, `Don't know`, and the codes
   `99` and `98`. A code whose legend label is one of these texts is removed as well.
4. When broken down by political affiliation or ethnicity, respondents without a value for
   this dimension are removed.
5. The answers are counted per year (and per group) and turned into percentages of the
   remaining respondents, rounded to one decimal place. The rounded values may not add up to
   exactly 100.

## Output

For each view, `surveydash` writes the wide table, the long table (columns `Year`,
`Political Affiliation` or `Ethnicity`, `Answer`, `Percentage`) and a chart description.
With a single year, the chart has one bar per answer. With several years, it has one stacked
bar per year, colored by answer.

 */
